//! Integration tests for cached acquisition and normalization
//!
//! A scripted fetcher stands in for the network so download counts and
//! failures can be controlled from the test.

use std::cell::Cell;

use chrono::NaiveDate;
use tempfile::TempDir;

use covid19tables::cache::Origin;
use covid19tables::data::normalize::{normalize, Field, Layout, Schema};
use covid19tables::{
    get_data_jhu, get_data_nyt, CacheManager, DataKind, Error, ErrorKind, Fetch, JhuRegion,
    JhuRequest, KindSelection, NytLevel, NytRequest, Shape, Source, Table, Warning,
};

const CONFIRMED: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20\n\
                         ,Italy,41.9,12.6,0,2,3\n\
                         Hubei,China,30.9,112.2,444,444,549\n";

const NYT_STATES: &str = "date,state,fips,cases,deaths\n\
                          2020-03-01,Washington,53,11,1\n\
                          2020-03-02,Washington,53,18,2\n";

/// Returns the same body for every URL while online, counting calls
struct ScriptedFetcher {
    body: &'static str,
    online: Cell<bool>,
    calls: Cell<usize>,
}

impl ScriptedFetcher {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            online: Cell::new(true),
            calls: Cell::new(0),
        }
    }
}

impl Fetch for ScriptedFetcher {
    fn fetch(&self, url: &str) -> covid19tables::Result<String> {
        self.calls.set(self.calls.get() + 1);
        if self.online.get() {
            Ok(self.body.to_string())
        } else {
            Err(Error::Network {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
}

fn confirmed_global() -> Source {
    Source::jhu(DataKind::Cases, JhuRegion::Global).unwrap()
}

#[test]
fn test_at_most_one_download_per_day() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);
    let source = confirmed_global();

    let first = cache.acquire_on(&source, day(1), false, &fetcher).unwrap();
    let second = cache.acquire_on(&source, day(1), false, &fetcher).unwrap();

    assert_eq!(fetcher.calls.get(), 1);
    assert_eq!(first.origin, Origin::Download);
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(first.path(), second.path());

    cache.acquire_on(&source, day(2), false, &fetcher).unwrap();
    assert_eq!(fetcher.calls.get(), 2);
    assert_eq!(cache.entries(&source).unwrap().len(), 2);
}

#[test]
fn test_force_always_downloads() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);
    let source = confirmed_global();

    cache.acquire_on(&source, day(1), false, &fetcher).unwrap();
    let forced = cache.acquire_on(&source, day(1), true, &fetcher).unwrap();

    assert_eq!(fetcher.calls.get(), 2);
    assert_eq!(forced.origin, Origin::Download);
    assert_eq!(cache.entries(&source).unwrap().len(), 1);
}

#[test]
fn test_failed_download_falls_back_to_latest_with_warning() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);
    let source = confirmed_global();

    cache.acquire_on(&source, day(1), false, &fetcher).unwrap();
    cache.acquire_on(&source, day(3), false, &fetcher).unwrap();
    fetcher.online.set(false);

    let stale = cache.acquire_on(&source, day(5), false, &fetcher).unwrap();
    assert_eq!(stale.origin, Origin::StaleFallback);
    assert_eq!(stale.entry.date, day(3));
    match stale.warning {
        Some(Warning::StaleData { cached_on, .. }) => assert_eq!(cached_on, day(3)),
        other => panic!("expected stale warning, got {:?}", other),
    }
    assert_eq!(stale.read_text().unwrap(), CONFIRMED);
}

#[test]
fn test_failed_download_without_cache_is_acquisition_error() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);
    fetcher.online.set(false);

    let err = cache
        .acquire_on(&confirmed_global(), day(1), false, &fetcher)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Acquisition);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_sources_are_cached_independently() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);

    cache.acquire_on(&confirmed_global(), day(1), false, &fetcher).unwrap();
    fetcher.online.set(false);

    let deaths = Source::jhu(DataKind::Deaths, JhuRegion::Global).unwrap();
    let err = cache.acquire_on(&deaths, day(1), false, &fetcher).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Acquisition);
}

#[test]
fn test_offline_getter_reports_stale_warning() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(NYT_STATES);

    let source = Source::nyt(NytLevel::States);
    cache.acquire_on(&source, day(1), false, &fetcher).unwrap();
    fetcher.online.set(false);

    let loaded = get_data_nyt(&cache, &fetcher, &NytRequest::default()).unwrap();
    assert_eq!(loaded.warnings.len(), 1);
    assert!(loaded.warnings[0].to_string().contains("2020-04-01"));
    assert_eq!(loaded.table.len(), 2);
}

#[test]
fn test_update_flag_downloads_again() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);
    let request = JhuRequest {
        kinds: KindSelection::One(DataKind::Cases),
        ..Default::default()
    };

    get_data_jhu(&cache, &fetcher, &request).unwrap();
    get_data_jhu(&cache, &fetcher, &request).unwrap();
    assert_eq!(fetcher.calls.get(), 1);

    let update = JhuRequest {
        update: true,
        ..request
    };
    get_data_jhu(&cache, &fetcher, &update).unwrap();
    assert_eq!(fetcher.calls.get(), 2);
}

#[test]
fn test_normalization_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new(CONFIRMED);
    let request = JhuRequest {
        kinds: KindSelection::One(DataKind::Cases),
        ..Default::default()
    };

    let first = get_data_jhu(&cache, &fetcher, &request).unwrap().table;
    let second = get_data_jhu(&cache, &fetcher, &request).unwrap().table;
    assert_eq!(first, second);

    let mut a = Vec::new();
    let mut b = Vec::new();
    first.write_csv(&mut a).unwrap();
    second.write_csv(&mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_wide_date_columns_to_long_rows() {
    let schema = Schema {
        regions: vec![Field::required("country_region", &["Country"])],
        layout: Layout::DateColumns { value: "cases" },
    };
    let text = "Country,1/22/20,1/23/20\nUSA,1,2\n";

    let long = normalize(text, &schema, Shape::Long)
        .unwrap()
        .into_long()
        .unwrap();
    assert_eq!(long.len(), 2);
    let rows = long.rows().unwrap();
    assert_eq!(rows[0].region, vec!["USA"]);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 22).unwrap());
    assert_eq!(rows[0].values, vec![Some(1.0)]);
    assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2020, 1, 23).unwrap());
    assert_eq!(rows[1].values, vec![Some(2.0)]);

    match normalize(text, &schema, Shape::Wide).unwrap() {
        Table::Wide(wide) => {
            assert_eq!(wide.dates().len(), 2);
            assert_eq!(wide.rows().unwrap()[0].values, vec![Some(1.0), Some(2.0)]);
        }
        Table::Long(_) => panic!("expected wide table"),
    }
}

#[test]
fn test_missing_required_column_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::new("Region,1/22/20\nItaly,1\n");

    let err = get_data_jhu(
        &cache,
        &fetcher,
        &JhuRequest {
            kinds: KindSelection::One(DataKind::Cases),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
}
