//! Integration tests for CLI argument handling
//!
//! Runs the built binary against a temporary cache directory. Every case
//! here is answered from disk or rejected before any download starts.

use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::Local;
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_covid19tables"))
        .args(args)
        .env_remove("COVID19TABLES_CACHE_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute covid19tables")
}

fn run_with_cache(cache: &Path, args: &[&str]) -> std::process::Output {
    let mut full = vec!["--cache-dir", cache.to_str().unwrap()];
    full.extend_from_slice(args);
    run_cli(&full)
}

/// Writes today's JHU global confirmed file so no download is needed
fn seed_confirmed_global(cache: &Path) {
    let dir = cache.join("jhu");
    fs::create_dir_all(&dir).unwrap();
    let today = Local::now().date_naive().format("%Y-%m-%d");
    fs::write(
        dir.join(format!("confirmed_global_{}.csv", today)),
        "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
         ,Italy,41.9,12.6,0,2\n\
         Hubei,China,30.9,112.2,444,444\n",
    )
    .unwrap();
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("covid19tables"));
    assert!(stdout.contains("jhu"));
    assert!(stdout.contains("nyt"));
}

#[test]
fn test_invalid_kind_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    let output = run_with_cache(dir.path(), &["jhu", "--kind", "hospitalized"]);
    assert!(!output.status.success(), "Expected invalid kind to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Error: Invalid data kind"),
        "Should name the invalid kind: {}",
        stderr
    );
}

#[test]
fn test_wide_with_all_kinds_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = run_with_cache(dir.path(), &["nyt", "--format", "wide"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("wide format requires a single data kind"), "{}", stderr);
}

#[test]
fn test_cache_listing_empty() {
    let dir = TempDir::new().unwrap();
    let output = run_with_cache(dir.path(), &["cache"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No cached files"));
}

#[test]
fn test_cache_listing_json() {
    let dir = TempDir::new().unwrap();
    seed_confirmed_global(dir.path());

    let output = run_with_cache(dir.path(), &["cache", "--json"]);
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["provider"], "Jhu");
    assert_eq!(
        records[0]["date"],
        Local::now().date_naive().format("%Y-%m-%d").to_string()
    );
}

#[test]
fn test_jhu_served_from_todays_cache() {
    let dir = TempDir::new().unwrap();
    seed_confirmed_global(dir.path());

    let output = run_with_cache(dir.path(), &["jhu", "--kind", "cases"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "date,country_region,province_state,cases");
    assert_eq!(lines.len(), 5);
    assert!(lines.contains(&"2020-01-23,Italy,,2"));
}

#[test]
fn test_jhu_wide_region_filter() {
    let dir = TempDir::new().unwrap();
    seed_confirmed_global(dir.path());

    let output = run_with_cache(
        dir.path(),
        &["jhu", "--kind", "cases", "--format", "wide", "--regions", "China"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("2020-01-22,2020-01-23"), "{}", lines[0]);
    assert!(lines[1].starts_with("China,Hubei"), "{}", lines[1]);
}

#[test]
fn test_unknown_region_is_an_error() {
    let dir = TempDir::new().unwrap();
    seed_confirmed_global(dir.path());

    let output = run_with_cache(dir.path(), &["jhu", "--kind", "cases", "--regions", "Atlantis"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Atlantis"), "{}", stderr);
}

#[test]
fn test_plain_bar_chart_from_cache() {
    let dir = TempDir::new().unwrap();
    seed_confirmed_global(dir.path());

    let output = run_with_cache(
        dir.path(),
        &["plot", "jhu", "--chart", "bar", "--plain", "--width", "40", "--height", "8"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 8);
    let china = stdout.lines().position(|l| l.contains("China")).unwrap();
    let italy = stdout.lines().position(|l| l.contains("Italy")).unwrap();
    assert!(china < italy, "{}", stdout);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use covid19tables::cli::{parse_kind_arg, ChartKind, Cli, Command, PlotConfig};
    use covid19tables::{DataKind, KindSelection, NytLevel, Provider};

    #[test]
    fn test_cli_version_check_subcommand() {
        let cli = Cli::parse_from(["covid19tables", "version-check"]);
        assert!(matches!(cli.command, Command::VersionCheck));
    }

    #[test]
    fn test_cli_cache_json_flag() {
        let cli = Cli::parse_from(["covid19tables", "cache", "--json"]);
        match cli.command {
            Command::Cache(args) => assert!(args.json),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["covid19tables"]).is_err());
    }

    #[test]
    fn test_parse_kind_arg_deaths() {
        assert_eq!(
            parse_kind_arg("deaths").unwrap(),
            KindSelection::One(DataKind::Deaths)
        );
    }

    #[test]
    fn test_plot_nyt_counties_sparklines() {
        let cli = Cli::parse_from([
            "covid19tables",
            "plot",
            "nyt",
            "--counties",
            "--chart",
            "spark",
            "--top",
            "5",
            "--group-by",
            "county",
        ]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot command");
        };
        let config = PlotConfig::from_args(&args).unwrap();
        assert_eq!(config.provider, Provider::Nyt);
        assert_eq!(config.nyt_level, NytLevel::Counties);
        assert_eq!(config.chart, ChartKind::Spark);
        assert_eq!(config.query.top, Some(5));
        assert_eq!(config.query.group_by, "county");
    }
}
