//! Johns Hopkins CSSE time series
//!
//! JHU publishes one file per kind of count, with one column per date. The
//! global files cover countries and some provinces; the US files cover
//! counties and carry no recovered series.

use super::normalize::{normalize_long, Field, Layout, Schema};
use super::table::{LongTable, Table};
use super::{
    DataKind, JhuRegion, KindSelection, Loaded, Shape, Source, COUNTRY_REGION, COUNTY, FIPS,
    PROVINCE_STATE,
};
use crate::cache::CacheManager;
use crate::error::{Error, Result};
use crate::fetch::Fetch;

const COUNTRY_ALIASES: &[&str] = &["Country/Region", "Country_Region", "Country"];
const PROVINCE_ALIASES: &[&str] = &["Province/State", "Province_State", "State"];
const COUNTY_ALIASES: &[&str] = &["Admin2"];
const FIPS_ALIASES: &[&str] = &["FIPS"];

/// Options for [`get_data_jhu`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JhuRequest {
    pub kinds: KindSelection,
    pub region: JhuRegion,
    pub shape: Shape,
    /// Download again even if today's file is cached
    pub update: bool,
}

impl Default for JhuRequest {
    fn default() -> Self {
        Self {
            kinds: KindSelection::All,
            region: JhuRegion::Global,
            shape: Shape::Long,
            update: false,
        }
    }
}

/// Kinds of counts JHU publishes for a region
pub fn available_kinds(region: JhuRegion) -> &'static [DataKind] {
    match region {
        JhuRegion::Global => &[DataKind::Cases, DataKind::Deaths, DataKind::Recovered],
        JhuRegion::Us => &[DataKind::Cases, DataKind::Deaths],
    }
}

/// Column mapping for one JHU file
pub fn schema(kind: DataKind, region: JhuRegion) -> Schema {
    let regions = match region {
        JhuRegion::Global => vec![
            Field::required(COUNTRY_REGION, COUNTRY_ALIASES),
            Field::optional(PROVINCE_STATE, PROVINCE_ALIASES),
        ],
        JhuRegion::Us => vec![
            Field::required(COUNTRY_REGION, COUNTRY_ALIASES),
            Field::required(PROVINCE_STATE, PROVINCE_ALIASES),
            Field::optional(COUNTY, COUNTY_ALIASES),
            Field::optional(FIPS, FIPS_ALIASES),
        ],
    };
    Schema {
        regions,
        layout: Layout::DateColumns {
            value: kind.column(),
        },
    }
}

/// Gets JHU data as a normalized table
///
/// Each requested kind is acquired through the cache separately and the
/// resulting tables are joined on region and date.
pub fn get_data_jhu(
    cache: &CacheManager,
    fetcher: &dyn Fetch,
    request: &JhuRequest,
) -> Result<Loaded> {
    let kinds = request
        .kinds
        .resolve(available_kinds(request.region), "JHU")?;
    if request.shape == Shape::Wide && kinds.len() != 1 {
        return Err(Error::InvalidParameter(
            "wide format requires a single data kind; choose cases, deaths or recovered"
                .to_string(),
        ));
    }

    let mut warnings = Vec::new();
    let mut joined: Option<LongTable> = None;
    for kind in kinds {
        let source = Source::jhu(kind, request.region)?;
        let acquired = cache.acquire(&source, request.update, fetcher)?;
        warnings.extend(acquired.warning.clone());

        let text = acquired.read_text()?;
        let table = normalize_long(&text, &schema(kind, request.region))?;
        tracing::debug!(source = %source, rows = table.len(), "normalized");

        joined = Some(match joined {
            Some(acc) => acc.join(table)?,
            None => table,
        });
    }

    let long = joined.ok_or_else(|| Error::InvalidParameter("no data kinds requested".into()))?;
    Ok(Loaded {
        table: Table::from_long(long, request.shape)?,
        warnings,
    })
}
