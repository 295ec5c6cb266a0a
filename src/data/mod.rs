//! Dataset sources and the tables built from them
//!
//! A [`Source`] names one upstream CSV file. The provider modules ([`jhu`],
//! [`nyt`]) know which sources a request needs and how their columns map onto
//! the standard schema; [`normalize`] turns raw text into a [`Table`].

pub mod jhu;
pub mod normalize;
pub mod nyt;
pub mod table;

pub use jhu::{get_data_jhu, JhuRequest};
pub use normalize::{normalize, Field, Layout, Schema};
pub use nyt::{get_data_nyt, NytRequest};
pub use table::{LongRow, LongTable, Table, WideRow, WideTable};

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result, Warning};

/// Standard region column names shared by every provider
pub const COUNTRY_REGION: &str = "country_region";
pub const PROVINCE_STATE: &str = "province_state";
pub const COUNTY: &str = "county";
pub const FIPS: &str = "fips";

/// Upstream publishers of time-series data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Provider {
    /// Johns Hopkins University CSSE
    Jhu,
    /// The New York Times
    Nyt,
}

impl Provider {
    /// Name of the cache subdirectory for this provider
    pub fn dir_name(&self) -> &'static str {
        match self {
            Provider::Jhu => "jhu",
            Provider::Nyt => "nyt",
        }
    }
}

/// Kinds of counts published by the providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    Cases,
    Deaths,
    Recovered,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Cases, DataKind::Deaths, DataKind::Recovered];

    /// Standard column name for this kind
    pub fn column(&self) -> &'static str {
        match self {
            DataKind::Cases => "cases",
            DataKind::Deaths => "deaths",
            DataKind::Recovered => "recovered",
        }
    }

    /// Parses a kind from user input, accepting a few common spellings
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cases" | "confirmed" => Some(DataKind::Cases),
            "deaths" | "dead" => Some(DataKind::Deaths),
            "recovered" | "recoveries" => Some(DataKind::Recovered),
            _ => None,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Which kinds a getter should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSelection {
    One(DataKind),
    All,
}

impl KindSelection {
    /// Parses `all` or a single kind name
    pub fn from_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(KindSelection::All);
        }
        DataKind::from_str(s).map(KindSelection::One)
    }

    /// Expands the selection against the kinds a provider offers
    pub fn resolve(&self, available: &[DataKind], provider: &str) -> Result<Vec<DataKind>> {
        match self {
            KindSelection::All => Ok(available.to_vec()),
            KindSelection::One(kind) if available.contains(kind) => Ok(vec![*kind]),
            KindSelection::One(kind) => Err(Error::InvalidParameter(format!(
                "{} data has no '{}' series; available: {}",
                provider,
                kind,
                available
                    .iter()
                    .map(|k| k.column())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

/// Geographic coverage of the JHU time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JhuRegion {
    Global,
    Us,
}

/// Geographic level of the NYT files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NytLevel {
    States,
    Counties,
}

/// Output layout of a normalized table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// One row per region per date
    #[default]
    Long,
    /// One column per date
    Wide,
}

impl Shape {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "long" => Some(Shape::Long),
            "wide" => Some(Shape::Wide),
            _ => None,
        }
    }
}

const JHU_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";
const NYT_BASE_URL: &str = "https://raw.githubusercontent.com/nytimes/covid-19-data/master";

/// One upstream CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Jhu { kind: DataKind, region: JhuRegion },
    Nyt { level: NytLevel },
}

impl Source {
    /// Builds a JHU source, rejecting combinations JHU does not publish
    pub fn jhu(kind: DataKind, region: JhuRegion) -> Result<Self> {
        if region == JhuRegion::Us && kind == DataKind::Recovered {
            return Err(Error::InvalidParameter(
                "JHU does not publish recovered counts for the US".to_string(),
            ));
        }
        Ok(Source::Jhu { kind, region })
    }

    /// Every file the providers publish
    pub fn all() -> Vec<Source> {
        vec![
            Source::Jhu { kind: DataKind::Cases, region: JhuRegion::Global },
            Source::Jhu { kind: DataKind::Deaths, region: JhuRegion::Global },
            Source::Jhu { kind: DataKind::Recovered, region: JhuRegion::Global },
            Source::Jhu { kind: DataKind::Cases, region: JhuRegion::Us },
            Source::Jhu { kind: DataKind::Deaths, region: JhuRegion::Us },
            Source::Nyt { level: NytLevel::States },
            Source::Nyt { level: NytLevel::Counties },
        ]
    }

    pub fn nyt(level: NytLevel) -> Self {
        Source::Nyt { level }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Source::Jhu { .. } => Provider::Jhu,
            Source::Nyt { .. } => Provider::Nyt,
        }
    }

    /// File name stem used for cache entries of this source
    pub fn file_stem(&self) -> String {
        match self {
            Source::Jhu { kind, region } => {
                let kind = match kind {
                    DataKind::Cases => "confirmed",
                    DataKind::Deaths => "deaths",
                    DataKind::Recovered => "recovered",
                };
                let region = match region {
                    JhuRegion::Global => "global",
                    JhuRegion::Us => "us",
                };
                format!("{}_{}", kind, region)
            }
            Source::Nyt { level } => match level {
                NytLevel::States => "us_states".to_string(),
                NytLevel::Counties => "us_counties".to_string(),
            },
        }
    }

    /// Fixed upstream URL of this source
    pub fn url(&self) -> String {
        match self {
            Source::Jhu { kind, region } => {
                let kind = match kind {
                    DataKind::Cases => "confirmed",
                    DataKind::Deaths => "deaths",
                    DataKind::Recovered => "recovered",
                };
                let region = match region {
                    JhuRegion::Global => "global",
                    JhuRegion::Us => "US",
                };
                format!("{}/time_series_covid19_{}_{}.csv", JHU_BASE_URL, kind, region)
            }
            Source::Nyt { level } => match level {
                NytLevel::States => format!("{}/us-states.csv", NYT_BASE_URL),
                NytLevel::Counties => format!("{}/us-counties.csv", NYT_BASE_URL),
            },
        }
    }

    /// Human-readable name used in messages
    pub fn name(&self) -> String {
        format!("{} {}", self.provider().dir_name(), self.file_stem().replace('_', " "))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A normalized table together with the warnings raised while loading it
#[derive(Debug, Clone)]
pub struct Loaded {
    pub table: Table,
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jhu_us_recovered_is_rejected() {
        let err = Source::jhu(DataKind::Recovered, JhuRegion::Us).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_jhu_urls() {
        let source = Source::jhu(DataKind::Cases, JhuRegion::Global).unwrap();
        assert!(source.url().ends_with("time_series_covid19_confirmed_global.csv"));
        let source = Source::jhu(DataKind::Deaths, JhuRegion::Us).unwrap();
        assert!(source.url().ends_with("time_series_covid19_deaths_US.csv"));
    }

    #[test]
    fn test_nyt_urls_and_stems() {
        let states = Source::nyt(NytLevel::States);
        let counties = Source::nyt(NytLevel::Counties);
        assert!(states.url().ends_with("us-states.csv"));
        assert!(counties.url().ends_with("us-counties.csv"));
        assert_eq!(states.file_stem(), "us_states");
        assert_eq!(counties.provider(), Provider::Nyt);
    }

    #[test]
    fn test_stems_are_distinct_per_provider() {
        let sources = Source::all();
        let mut keys: Vec<(Provider, String)> =
            sources.iter().map(|s| (s.provider(), s.file_stem())).collect();
        keys.sort_by(|a, b| a.1.cmp(&b.1));
        keys.dedup();
        assert_eq!(keys.len(), sources.len());
    }

    #[test]
    fn test_kind_selection_parsing() {
        assert_eq!(KindSelection::from_str("all"), Some(KindSelection::All));
        assert_eq!(
            KindSelection::from_str("confirmed"),
            Some(KindSelection::One(DataKind::Cases))
        );
        assert_eq!(KindSelection::from_str("bogus"), None);
    }

    #[test]
    fn test_kind_selection_resolve_rejects_unavailable() {
        let available = [DataKind::Cases, DataKind::Deaths];
        let err = KindSelection::One(DataKind::Recovered)
            .resolve(&available, "NYT")
            .unwrap_err();
        assert!(err.to_string().contains("recovered"));
        assert_eq!(
            KindSelection::All.resolve(&available, "NYT").unwrap(),
            available.to_vec()
        );
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!(Shape::from_str("WIDE"), Some(Shape::Wide));
        assert_eq!(Shape::from_str("long"), Some(Shape::Long));
        assert_eq!(Shape::from_str("tall"), None);
    }
}
