//! Diagnostic logging setup
//!
//! Log lines go to stderr so CSV written to stdout stays clean. `RUST_LOG`
//! overrides the level chosen from the verbosity flag.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count
pub fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    format!("covid19tables={}", level)
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_levels() {
        assert_eq!(default_directive(0), "covid19tables=error");
        assert_eq!(default_directive(2), "covid19tables=info");
        assert_eq!(default_directive(9), "covid19tables=trace");
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging(1);
        init_logging(3);
    }
}
