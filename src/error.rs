//! Error and warning types shared by every module
//!
//! Fatal failures are variants of [`Error`]; non-fatal conditions are returned
//! to the caller as [`Warning`] values next to the data they qualify.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while acquiring, normalizing or querying data
#[derive(Debug, Error)]
pub enum Error {
    /// The remote host could not be reached or answered with a failure
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// No data is available at all: the download failed and nothing is cached
    #[error("No data available for {source_name}: download failed ({cause}) and no cached copy exists")]
    Acquisition { source_name: String, cause: String },

    /// An expected field is missing or a cell could not be interpreted
    #[error("Schema error: {0}")]
    Schema(String),

    /// A selector referenced a region, column or date that is not present
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// The caller asked for a combination of options that does not exist
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filesystem failure while reading or writing the cache
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Dataframe operation failure
    #[error("Table error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),
}

/// Plain tag for matching on error categories without destructuring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Acquisition,
    Schema,
    Lookup,
    InvalidParameter,
    Io,
    Csv,
    Frame,
}

impl Error {
    /// Returns the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network { .. } => ErrorKind::Network,
            Error::Acquisition { .. } => ErrorKind::Acquisition,
            Error::Schema(_) => ErrorKind::Schema,
            Error::Lookup(_) => ErrorKind::Lookup,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::Io(_) => ErrorKind::Io,
            Error::Csv(_) => ErrorKind::Csv,
            Error::Frame(_) => ErrorKind::Frame,
        }
    }

    pub(crate) fn network(url: &str, reason: impl fmt::Display) -> Self {
        Error::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        Error::Network {
            url,
            reason: err.to_string(),
        }
    }
}

/// Non-fatal conditions reported alongside a successful result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A fresh download failed and an older cached file was used instead
    StaleData {
        source_name: String,
        cached_on: NaiveDate,
        path: PathBuf,
        cause: String,
    },
    /// The published version differs from the running one
    OutdatedVersion { local: String, remote: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::StaleData {
                source_name,
                cached_on,
                cause,
                ..
            } => write!(
                f,
                "Unable to download fresh {} data ({}). Using cached data from {}.",
                source_name, cause, cached_on
            ),
            Warning::OutdatedVersion { local, remote } => write!(
                f,
                "Your version of covid19tables ({}) is out-of-date. Latest is {}.",
                local, remote
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_tags() {
        assert_eq!(Error::network("http://x", "down").kind(), ErrorKind::Network);
        assert_eq!(Error::Schema("x".into()).kind(), ErrorKind::Schema);
        assert_eq!(Error::Lookup("x".into()).kind(), ErrorKind::Lookup);
        assert_eq!(
            Error::InvalidParameter("x".into()).kind(),
            ErrorKind::InvalidParameter
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(Error::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_acquisition_message_names_source() {
        let err = Error::Acquisition {
            source_name: "jhu confirmed global".into(),
            cause: "offline".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("jhu confirmed global"));
        assert!(msg.contains("offline"));
    }

    #[test]
    fn test_stale_warning_display_mentions_date() {
        let warning = Warning::StaleData {
            source_name: "nyt states".into(),
            cached_on: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
            path: PathBuf::from("/tmp/x.csv"),
            cause: "timeout".into(),
        };
        let msg = warning.to_string();
        assert!(msg.contains("2020-04-01"));
        assert!(msg.contains("nyt states"));
    }
}
