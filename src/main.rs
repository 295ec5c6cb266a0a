//! covid19tables - COVID-19 time series as CSV tables and terminal charts
//!
//! Data is downloaded at most once per day per source and cached on disk; when
//! a download fails the most recent cached copy is used with a warning.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use covid19tables::cli::{
    parse_format_arg, parse_kind_arg, parse_region_arg, CacheArgs, ChartKind, Cli, Command,
    JhuArgs, NytArgs, PlotArgs, PlotConfig, TableQuery,
};
use covid19tables::logging::init_logging;
use covid19tables::plot::{self, ChartOptions};
use covid19tables::{
    check_latest_version, get_data_jhu, get_data_nyt, CacheManager, Error, HttpFetcher,
    JhuRequest, KindSelection, NytLevel, NytRequest, Provider, Shape, Source, Table, Warning,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cache = open_cache(cli.cache_dir)?;

    match cli.command {
        Command::Jhu(args) => run_jhu(&cache, &args),
        Command::Nyt(args) => run_nyt(&cache, &args),
        Command::Plot(args) => run_plot(&cache, &args),
        Command::VersionCheck => run_version_check(),
        Command::Cache(args) => run_cache(&cache, &args),
    }
}

fn open_cache(dir: Option<PathBuf>) -> Result<CacheManager, Error> {
    match dir {
        Some(dir) => Ok(CacheManager::with_dir(dir)),
        None => CacheManager::new().ok_or_else(|| {
            Error::InvalidParameter(
                "no cache directory could be determined; pass --cache-dir".to_string(),
            )
        }),
    }
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn run_jhu(cache: &CacheManager, args: &JhuArgs) -> Result<(), Box<dyn std::error::Error>> {
    let request = JhuRequest {
        kinds: parse_kind_arg(&args.kind)?,
        region: parse_region_arg(&args.region)?,
        shape: Shape::Long,
        update: args.query.update,
    };
    let shape = parse_format_arg(&args.format)?;
    let query = TableQuery::from_args(&args.query, Provider::Jhu)?;
    check_wide_request(request.kinds, shape)?;

    let fetcher = HttpFetcher::new()?;
    let loaded = get_data_jhu(cache, &fetcher, &request)?;
    print_warnings(&loaded.warnings);

    let long = query.apply(&loaded.table.into_long()?)?;
    write_table(&Table::from_long(long, shape)?, args.output.as_deref())
}

fn run_nyt(cache: &CacheManager, args: &NytArgs) -> Result<(), Box<dyn std::error::Error>> {
    let request = NytRequest {
        kinds: parse_kind_arg(&args.kind)?,
        level: if args.counties {
            NytLevel::Counties
        } else {
            NytLevel::States
        },
        shape: Shape::Long,
        update: args.query.update,
    };
    let shape = parse_format_arg(&args.format)?;
    let query = TableQuery::from_args(&args.query, Provider::Nyt)?;
    check_wide_request(request.kinds, shape)?;

    let fetcher = HttpFetcher::new()?;
    let loaded = get_data_nyt(cache, &fetcher, &request)?;
    print_warnings(&loaded.warnings);

    let long = query.apply(&loaded.table.into_long()?)?;
    write_table(&Table::from_long(long, shape)?, args.output.as_deref())
}

/// Rejects wide output for several kinds before anything is downloaded
fn check_wide_request(kinds: KindSelection, shape: Shape) -> Result<(), Error> {
    if shape == Shape::Wide && kinds == KindSelection::All {
        return Err(Error::InvalidParameter(
            "wide format requires a single data kind; pass --kind".to_string(),
        ));
    }
    Ok(())
}

fn write_table(table: &Table, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            table.write_csv(BufWriter::new(file))?;
            tracing::info!(path = %path.display(), rows = table.len(), "table written");
        }
        None => {
            let stdout = io::stdout();
            table.write_csv(stdout.lock())?;
        }
    }
    Ok(())
}

fn run_plot(cache: &CacheManager, args: &PlotArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = PlotConfig::from_args(args)?;
    let fetcher = HttpFetcher::new()?;
    let kinds = KindSelection::One(config.kind);

    let loaded = match config.provider {
        Provider::Jhu => get_data_jhu(
            cache,
            &fetcher,
            &JhuRequest {
                kinds,
                region: config.jhu_region,
                shape: Shape::Long,
                update: args.query.update,
            },
        )?,
        Provider::Nyt => get_data_nyt(
            cache,
            &fetcher,
            &NytRequest {
                kinds,
                level: config.nyt_level,
                shape: Shape::Long,
                update: args.query.update,
            },
        )?,
    };
    print_warnings(&loaded.warnings);

    let table = config.query.apply(&loaded.table.into_long()?)?;
    let column = config.kind.column();
    let options = ChartOptions {
        title: format!(" {} {} ", config.provider.dir_name().to_uppercase(), column),
        width: args.width,
        height: args.height,
    };
    let buf = match config.chart {
        ChartKind::Line => plot::line_chart(&table, column, &options)?,
        ChartKind::Bar => plot::bar_chart(&table, column, &options)?,
        ChartKind::Spark => plot::sparklines(&table, column, &options)?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.plain {
        out.write_all(plot::buffer_to_string(&buf).as_bytes())?;
        out.flush()?;
    } else {
        plot::print_buffer(&buf, &mut out)?;
    }
    Ok(())
}

fn run_version_check() -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = HttpFetcher::new()?;
    match check_latest_version(&fetcher)? {
        Some(warning) => print_warnings(&[warning]),
        None => println!("covid19tables {} is up to date", covid19tables::version::version()),
    }
    Ok(())
}

/// One cached file as listed by the cache command
#[derive(Debug, Serialize)]
struct CacheRecord {
    source: String,
    provider: Provider,
    date: String,
    path: PathBuf,
}

fn run_cache(cache: &CacheManager, args: &CacheArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    for source in Source::all() {
        for entry in cache.entries(&source)? {
            records.push(CacheRecord {
                source: source.name(),
                provider: source.provider(),
                date: entry.date.to_string(),
                path: entry.path,
            });
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &records)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Cache directory: {}", cache.root().display())?;
    if records.is_empty() {
        writeln!(out, "No cached files")?;
    }
    for record in &records {
        writeln!(out, "{:<24} {}  {}", record.source, record.date, record.path.display())?;
    }
    Ok(())
}
