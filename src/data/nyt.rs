//! New York Times US time series
//!
//! NYT publishes one long-format file per geographic level, holding both
//! cases and deaths with one row per region per day.

use super::normalize::{normalize_long, Field, Layout, Schema};
use super::table::Table;
use super::{DataKind, KindSelection, Loaded, NytLevel, Shape, Source, COUNTY, FIPS, PROVINCE_STATE};
use crate::cache::CacheManager;
use crate::error::{Error, Result};
use crate::fetch::Fetch;

/// Kinds of counts NYT publishes
pub const AVAILABLE_KINDS: [DataKind; 2] = [DataKind::Cases, DataKind::Deaths];

/// Options for [`get_data_nyt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NytRequest {
    pub kinds: KindSelection,
    pub level: NytLevel,
    pub shape: Shape,
    /// Download again even if today's file is cached
    pub update: bool,
}

impl Default for NytRequest {
    fn default() -> Self {
        Self {
            kinds: KindSelection::All,
            level: NytLevel::States,
            shape: Shape::Long,
            update: false,
        }
    }
}

/// Column mapping for an NYT file
pub fn schema(level: NytLevel) -> Schema {
    let regions = match level {
        NytLevel::States => vec![
            Field::required(PROVINCE_STATE, &["state"]),
            Field::optional(FIPS, &[]),
        ],
        NytLevel::Counties => vec![
            Field::required(PROVINCE_STATE, &["state"]),
            Field::required(COUNTY, &[]),
            Field::optional(FIPS, &[]),
        ],
    };
    Schema {
        regions,
        layout: Layout::DateRows {
            date: Field::required("date", &[]),
            values: vec![
                Field::required(DataKind::Cases.column(), &["confirmed"]),
                Field::required(DataKind::Deaths.column(), &[]),
            ],
        },
    }
}

/// Gets NYT data as a normalized table
pub fn get_data_nyt(
    cache: &CacheManager,
    fetcher: &dyn Fetch,
    request: &NytRequest,
) -> Result<Loaded> {
    let kinds = request.kinds.resolve(&AVAILABLE_KINDS, "NYT")?;
    if request.shape == Shape::Wide && kinds.len() != 1 {
        return Err(Error::InvalidParameter(
            "wide format requires a single data kind; choose cases or deaths".to_string(),
        ));
    }

    let source = Source::nyt(request.level);
    let acquired = cache.acquire(&source, request.update, fetcher)?;
    let text = acquired.read_text()?;
    let long = normalize_long(&text, &schema(request.level))?;
    tracing::debug!(source = %source, rows = long.len(), "normalized");

    let columns: Vec<&str> = kinds.iter().map(|k| k.column()).collect();
    let long = long.project_values(&columns)?;

    Ok(Loaded {
        table: Table::from_long(long, request.shape)?,
        warnings: acquired.warning.into_iter().collect(),
    })
}
