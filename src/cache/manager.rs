//! Cache manager for persisting downloaded files to disk
//!
//! Provides a `CacheManager` that stores one raw CSV file per source per day,
//! supporting graceful degradation when the network is unavailable.

use chrono::{Local, NaiveDate};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::Source;
use crate::error::{Error, Result, Warning};
use crate::fetch::Fetch;

/// Date format embedded in cache file names
const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A file on disk holding one day's download for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub source: Source,
    /// Day the file was downloaded
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Where the data returned by an acquisition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Today's file was already on disk
    Cache,
    /// A fresh download was written to disk
    Download,
    /// The download failed and an older file was used
    StaleFallback,
}

/// Result of acquiring a source
#[derive(Debug, Clone)]
pub struct Acquired {
    pub entry: CacheEntry,
    pub origin: Origin,
    /// Present when stale data was served
    pub warning: Option<Warning>,
}

impl Acquired {
    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    /// Reads the acquired file's contents
    pub fn read_text(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.entry.path)?)
    }
}

/// Manages reading and writing cached downloads
///
/// Files live under an XDG-compliant cache directory (`~/.cache/covid19tables/`
/// on Linux), in one subdirectory per provider, named
/// `<stem>_<YYYY-MM-DD>.csv`.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Root directory holding the provider subdirectories
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "covid19tables")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Root cache directory
    pub fn root(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory holding every entry of the source's provider
    pub fn source_dir(&self, source: &Source) -> PathBuf {
        self.cache_dir.join(source.provider().dir_name())
    }

    /// Path of the entry for `source` on `date`, whether or not it exists
    pub fn entry_path(&self, source: &Source, date: NaiveDate) -> PathBuf {
        self.source_dir(source).join(format!(
            "{}_{}.csv",
            source.file_stem(),
            date.format(FILE_DATE_FORMAT)
        ))
    }

    /// Ensures the provider directory exists
    fn ensure_dir(&self, source: &Source) -> std::io::Result<()> {
        fs::create_dir_all(self.source_dir(source))
    }

    /// Writes a download as the entry for `date`, replacing any earlier attempt that day
    ///
    /// The text goes to a temporary sibling first and is renamed into place, so an
    /// interrupted write never leaves a truncated entry behind.
    pub fn write(&self, source: &Source, date: NaiveDate, text: &str) -> Result<CacheEntry> {
        self.ensure_dir(source)?;

        let path = self.entry_path(source, date);
        let tmp = path.with_extension("csv.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;

        Ok(CacheEntry {
            source: *source,
            date,
            path,
        })
    }

    /// Returns the entry for `date` if it exists on disk
    pub fn entry(&self, source: &Source, date: NaiveDate) -> Option<CacheEntry> {
        let path = self.entry_path(source, date);
        path.is_file().then(|| CacheEntry {
            source: *source,
            date,
            path,
        })
    }

    /// Lists every cached entry of a source, oldest first
    pub fn entries(&self, source: &Source) -> Result<Vec<CacheEntry>> {
        let dir = self.source_dir(source);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}_", source.file_stem());
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            let date = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.strip_suffix(".csv"))
                .and_then(|d| NaiveDate::parse_from_str(d, FILE_DATE_FORMAT).ok());
            if let Some(date) = date {
                if path.is_file() {
                    entries.push(CacheEntry {
                        source: *source,
                        date,
                        path,
                    });
                }
            }
        }
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    /// Most recent cached entry of a source, from any day
    pub fn latest(&self, source: &Source) -> Result<Option<CacheEntry>> {
        Ok(self.entries(source)?.pop())
    }

    /// Returns a file holding today's data for `source`
    ///
    /// See [`CacheManager::acquire_on`].
    pub fn acquire(&self, source: &Source, force: bool, fetcher: &dyn Fetch) -> Result<Acquired> {
        self.acquire_on(source, Local::now().date_naive(), force, fetcher)
    }

    /// Returns a file holding `today`'s data for `source`
    ///
    /// # Behavior
    /// - Today's entry is reused without network access unless `force` is set
    /// - Otherwise the source is downloaded and written as today's entry
    /// - If the download fails, the most recent entry from any day is returned
    ///   with a [`Warning::StaleData`]
    /// - If the download fails and nothing is cached, returns [`Error::Acquisition`]
    pub fn acquire_on(
        &self,
        source: &Source,
        today: NaiveDate,
        force: bool,
        fetcher: &dyn Fetch,
    ) -> Result<Acquired> {
        if !force {
            if let Some(entry) = self.entry(source, today) {
                tracing::debug!(source = %source, path = %entry.path.display(), "using today's cached file");
                return Ok(Acquired {
                    entry,
                    origin: Origin::Cache,
                    warning: None,
                });
            }
        }

        let fetch_error = match fetcher.fetch(&source.url()) {
            Ok(text) => {
                let entry = self.write(source, today, &text)?;
                tracing::info!(source = %source, path = %entry.path.display(), "downloaded fresh data");
                return Ok(Acquired {
                    entry,
                    origin: Origin::Download,
                    warning: None,
                });
            }
            Err(e) => e,
        };

        match self.latest(source)? {
            Some(entry) => {
                let warning = Warning::StaleData {
                    source_name: source.name(),
                    cached_on: entry.date,
                    path: entry.path.clone(),
                    cause: fetch_error.to_string(),
                };
                tracing::warn!(source = %source, cached_on = %entry.date, error = %fetch_error, "download failed, using cached data");
                Ok(Acquired {
                    entry,
                    origin: Origin::StaleFallback,
                    warning: Some(warning),
                })
            }
            None => Err(Error::Acquisition {
                source_name: source.name(),
                cause: fetch_error.to_string(),
            }),
        }
    }
}
