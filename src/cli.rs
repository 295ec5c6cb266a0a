//! Command-line interface parsing for covid19tables
//!
//! Arguments are parsed with clap and then validated into plain option
//! structs ([`TableQuery`], [`PlotConfig`]) so invalid names are reported
//! before any download starts.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;

use crate::data::normalize::parse_date;
use crate::data::table::LongTable;
use crate::data::{
    DataKind, JhuRegion, KindSelection, NytLevel, Provider, Shape, COUNTRY_REGION, PROVINCE_STATE,
};
use crate::select;

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Invalid data kind: '{0}'. Valid kinds: cases, deaths, recovered, all")]
    InvalidKind(String),

    #[error("Invalid region: '{0}'. Valid regions: global, us")]
    InvalidRegion(String),

    #[error("Invalid format: '{0}'. Valid formats: long, wide")]
    InvalidFormat(String),

    #[error("Invalid date: '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid chart: '{0}'. Valid charts: line, bar, spark")]
    InvalidChart(String),

    #[error("Invalid provider: '{0}'. Valid providers: jhu, nyt")]
    InvalidProvider(String),

    #[error("--{0} is not available for {1} data")]
    NotApplicable(&'static str, &'static str),
}

/// Fetch, cache and tabulate COVID-19 time series
#[derive(Parser, Debug)]
#[command(name = "covid19tables")]
#[command(about = "COVID-19 case and death time series from JHU CSSE and the New York Times")]
#[command(version)]
pub struct Cli {
    /// Directory for cached downloads (defaults to the platform cache directory)
    #[arg(long, global = true, env = "COVID19TABLES_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Increase log output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print Johns Hopkins CSSE data as CSV
    Jhu(JhuArgs),
    /// Print New York Times data as CSV
    Nyt(NytArgs),
    /// Draw a chart of one provider's data
    Plot(PlotArgs),
    /// Check whether a newer release is published
    VersionCheck,
    /// List cached downloads
    Cache(CacheArgs),
}

/// Selection options shared by the table and plot commands
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Download again even if today's file is already cached
    #[arg(long)]
    pub update: bool,

    /// First date to keep (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Last date to keep (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Comma-separated region names to keep
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Column the --regions names are matched against
    #[arg(long, value_name = "COLUMN")]
    pub region_column: Option<String>,

    /// Keep only the N largest groups by latest value
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Column to aggregate by when --top is given
    #[arg(long, value_name = "COLUMN")]
    pub group_by: Option<String>,
}

#[derive(Args, Debug)]
pub struct JhuArgs {
    /// Data kind: cases, deaths, recovered or all
    #[arg(long, default_value = "all")]
    pub kind: String,

    /// Geographic coverage: global or us
    #[arg(long, default_value = "global")]
    pub region: String,

    /// Output shape: long or wide
    #[arg(long, default_value = "long")]
    pub format: String,

    /// Write CSV to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Args, Debug)]
pub struct NytArgs {
    /// Data kind: cases, deaths or all
    #[arg(long, default_value = "all")]
    pub kind: String,

    /// Use county-level data instead of states
    #[arg(long)]
    pub counties: bool,

    /// Output shape: long or wide
    #[arg(long, default_value = "long")]
    pub format: String,

    /// Write CSV to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Provider: jhu or nyt
    pub provider: String,

    /// Data kind to plot
    #[arg(long, default_value = "cases")]
    pub kind: String,

    /// JHU coverage: global or us
    #[arg(long)]
    pub region: Option<String>,

    /// Use NYT county-level data
    #[arg(long)]
    pub counties: bool,

    /// Chart type: line, bar or spark
    #[arg(long, default_value = "line")]
    pub chart: String,

    /// Chart width in columns
    #[arg(long, default_value_t = 100)]
    pub width: u16,

    /// Chart height in rows
    #[arg(long, default_value_t = 30)]
    pub height: u16,

    /// Print without colors
    #[arg(long)]
    pub plain: bool,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

/// Kinds of chart the plot command draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Spark,
}

/// Validated row selection applied after loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub regions: Vec<String>,
    pub region_column: String,
    pub top: Option<usize>,
    pub group_by: String,
}

impl TableQuery {
    /// Builds a query, defaulting region and grouping columns per provider
    pub fn from_args(args: &QueryArgs, provider: Provider) -> Result<Self, CliError> {
        let default_column = match provider {
            Provider::Jhu => COUNTRY_REGION,
            Provider::Nyt => PROVINCE_STATE,
        };
        Ok(TableQuery {
            from: args.from.as_deref().map(parse_date_arg).transpose()?,
            to: args.to.as_deref().map(parse_date_arg).transpose()?,
            regions: args
                .regions
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            region_column: args
                .region_column
                .clone()
                .unwrap_or_else(|| default_column.to_string()),
            top: args.top,
            group_by: args
                .group_by
                .clone()
                .unwrap_or_else(|| default_column.to_string()),
        })
    }
}

impl TableQuery {
    /// Applies the date range, region filter and top-N selection, in that order
    pub fn apply(&self, table: &LongTable) -> crate::error::Result<LongTable> {
        let mut table = if self.from.is_some() || self.to.is_some() {
            select::select_dates(table, self.from, self.to)?
        } else {
            table.clone()
        };

        if !self.regions.is_empty() {
            let names: Vec<&str> = self.regions.iter().map(|r| r.as_str()).collect();
            table = select::select_regions(&table, &self.region_column, &names)?;
        }

        if let Some(n) = self.top {
            let column = table
                .value_columns()
                .first()
                .cloned()
                .ok_or_else(|| crate::error::Error::Lookup("table has no value columns".into()))?;
            table = select::select_top_regions(&table, &column, n, &self.group_by)?;
        }

        Ok(table)
    }
}

/// Validated options of the plot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotConfig {
    pub provider: Provider,
    pub kind: DataKind,
    pub jhu_region: JhuRegion,
    pub nyt_level: NytLevel,
    pub chart: ChartKind,
    pub query: TableQuery,
}

impl PlotConfig {
    pub fn from_args(args: &PlotArgs) -> Result<Self, CliError> {
        let provider = parse_provider_arg(&args.provider)?;
        let kind = match parse_kind_arg(&args.kind)? {
            KindSelection::One(kind) => kind,
            KindSelection::All => return Err(CliError::InvalidKind(args.kind.clone())),
        };
        let jhu_region = match (&args.region, provider) {
            (Some(_), Provider::Nyt) => return Err(CliError::NotApplicable("region", "NYT")),
            (Some(region), Provider::Jhu) => parse_region_arg(region)?,
            (None, _) => JhuRegion::Global,
        };
        if args.counties && provider == Provider::Jhu {
            return Err(CliError::NotApplicable("counties", "JHU"));
        }
        Ok(PlotConfig {
            provider,
            kind,
            jhu_region,
            nyt_level: if args.counties {
                NytLevel::Counties
            } else {
                NytLevel::States
            },
            chart: parse_chart_arg(&args.chart)?,
            query: TableQuery::from_args(&args.query, provider)?,
        })
    }
}

pub fn parse_kind_arg(s: &str) -> Result<KindSelection, CliError> {
    KindSelection::from_str(s).ok_or_else(|| CliError::InvalidKind(s.to_string()))
}

pub fn parse_region_arg(s: &str) -> Result<JhuRegion, CliError> {
    match s.trim().to_lowercase().as_str() {
        "global" | "world" => Ok(JhuRegion::Global),
        "us" | "usa" => Ok(JhuRegion::Us),
        _ => Err(CliError::InvalidRegion(s.to_string())),
    }
}

pub fn parse_format_arg(s: &str) -> Result<Shape, CliError> {
    Shape::from_str(s).ok_or_else(|| CliError::InvalidFormat(s.to_string()))
}

pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    parse_date(s).ok_or_else(|| CliError::InvalidDate(s.to_string()))
}

pub fn parse_chart_arg(s: &str) -> Result<ChartKind, CliError> {
    match s.trim().to_lowercase().as_str() {
        "line" => Ok(ChartKind::Line),
        "bar" => Ok(ChartKind::Bar),
        "spark" | "sparkline" => Ok(ChartKind::Spark),
        _ => Err(CliError::InvalidChart(s.to_string())),
    }
}

pub fn parse_provider_arg(s: &str) -> Result<Provider, CliError> {
    match s.trim().to_lowercase().as_str() {
        "jhu" => Ok(Provider::Jhu),
        "nyt" => Ok(Provider::Nyt),
        _ => Err(CliError::InvalidProvider(s.to_string())),
    }
}
