//! covid19tables library
//!
//! Downloads COVID-19 time series from Johns Hopkins CSSE and the New York
//! Times, keeps one copy per source per day on disk, and normalizes the raw
//! CSV files into long or wide tables.

pub mod cache;
pub mod cli;
pub mod data;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod plot;
pub mod select;
pub mod version;

pub use cache::{Acquired, CacheEntry, CacheManager, Origin};
pub use data::{
    get_data_jhu, get_data_nyt, DataKind, JhuRegion, JhuRequest, KindSelection, Loaded, LongTable,
    NytLevel, NytRequest, Provider, Shape, Source, Table, WideTable,
};
pub use error::{Error, ErrorKind, Result, Warning};
pub use fetch::{Fetch, HttpFetcher};
pub use version::check_latest_version;
