//! Cache module for storing downloaded CSV files on disk
//!
//! Each source gets one file per calendar day inside its provider's cache
//! directory. A day's file is reused for the rest of that day; when a fresh
//! download fails, the most recent file from any earlier day is served with a
//! stale-data warning instead.

mod manager;

pub use manager::{Acquired, CacheEntry, CacheManager, Origin};
