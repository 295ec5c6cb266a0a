//! Opt-in check for a newer published release

use crate::error::{Result, Warning};
use crate::fetch::Fetch;

/// Plain-text file holding the latest published version number
pub const VERSION_URL: &str = "https://byu.box.com/shared/static/kkkun3iz1quiwwz4dmedm8fhu8qjuuiu.txt";

/// Version of this build
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Compares the running version against the published one
///
/// Returns `Ok(None)` when the versions match or when the version file cannot
/// be fetched; being offline is not an error here.
pub fn check_latest_version(fetcher: &dyn Fetch) -> Result<Option<Warning>> {
    check_against(fetcher, VERSION_URL, version())
}

fn check_against(fetcher: &dyn Fetch, url: &str, local: &str) -> Result<Option<Warning>> {
    let remote = match fetcher.fetch(url) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "version check skipped");
            return Ok(None);
        }
    };

    if remote.is_empty() || remote == local {
        return Ok(None);
    }

    Ok(Some(Warning::OutdatedVersion {
        local: local.to_string(),
        remote,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FixedFetcher(Option<&'static str>);

    impl Fetch for FixedFetcher {
        fn fetch(&self, url: &str) -> Result<String> {
            self.0
                .map(|s| s.to_string())
                .ok_or_else(|| Error::network(url, "offline"))
        }
    }

    #[test]
    fn test_offline_is_silent() {
        let result = check_against(&FixedFetcher(None), VERSION_URL, "0.1.0").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_matching_version_gives_no_warning() {
        let result = check_against(&FixedFetcher(Some("0.1.0\n")), VERSION_URL, "0.1.0").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_different_version_warns() {
        let result = check_against(&FixedFetcher(Some("0.2.0")), VERSION_URL, "0.1.0").unwrap();
        assert_eq!(
            result,
            Some(Warning::OutdatedVersion {
                local: "0.1.0".to_string(),
                remote: "0.2.0".to_string()
            })
        );
    }

    #[test]
    fn test_public_check_uses_crate_version() {
        let result = check_latest_version(&FixedFetcher(Some(env!("CARGO_PKG_VERSION")))).unwrap();
        assert!(result.is_none());
    }
}
