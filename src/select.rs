//! Selection and derived-column operations over long tables
//!
//! Every operation takes a table by reference and returns a new one, keeping
//! rows ordered by region then date. Referencing a column, region or date
//! that is not present is a [`Error::Lookup`]. Grouped work runs as polars
//! `group_by`/`agg` and window (`over`) expressions on the table's frame.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use polars::prelude::*;

use crate::data::table::{
    columns, epoch_days, from_epoch_days, number_values, row_key, sum_present, text_values,
    LongTable, DATE,
};
use crate::error::{Error, Result};

fn ensure_new_column(table: &LongTable, name: &str) -> Result<()> {
    if table.value_columns().iter().any(|c| c == name) {
        return Err(Error::InvalidParameter(format!(
            "column '{}' already exists",
            name
        )));
    }
    Ok(())
}

/// Rows whose `column` equals one of `values`
fn any_of(column: &str, values: &[&str]) -> Expr {
    values
        .iter()
        .fold(lit(false), |acc, v| acc.or(col(column).eq(lit(*v))))
}

/// Keeps rows whose `column` equals one of `values`
///
/// Every requested value must match at least one row.
pub fn select_regions(table: &LongTable, column: &str, values: &[&str]) -> Result<LongTable> {
    table.region_index(column)?;
    let present: HashSet<&str> = text_values(table.frame(), column)?
        .into_iter()
        .flatten()
        .collect();
    if let Some(missing) = values.iter().find(|v| !present.contains(*v)) {
        return Err(Error::Lookup(format!(
            "no rows with {} = '{}'",
            column, missing
        )));
    }

    let frame = table
        .frame()
        .clone()
        .lazy()
        .filter(any_of(column, values))
        .collect()?;
    Ok(table.with_frame(frame))
}

/// Keeps rows dated within `from..=to`; either bound may be open
///
/// A range that selects nothing from a non-empty table, an inverted one
/// included, is a lookup error.
pub fn select_dates(
    table: &LongTable,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<LongTable> {
    let dates = table.dates()?;
    let describe = || {
        let span = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => format!("table covers {} to {}", first, last),
            _ => "table is empty".to_string(),
        };
        Error::Lookup(format!(
            "no data between {} and {}; {}",
            from.map_or("the start".to_string(), |d| d.to_string()),
            to.map_or("the end".to_string(), |d| d.to_string()),
            span
        ))
    };
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(describe());
        }
    }

    let day = col(DATE).cast(DataType::Int32);
    let mut keep = lit(true);
    if let Some(from) = from {
        keep = keep.and(day.clone().gt_eq(lit(epoch_days(from))));
    }
    if let Some(to) = to {
        keep = keep.and(day.lt_eq(lit(epoch_days(to))));
    }
    let frame = table.frame().clone().lazy().filter(keep).collect()?;
    if frame.height() == 0 && !table.is_empty() {
        return Err(describe());
    }
    Ok(table.with_frame(frame))
}

/// Sums every value column over rows sharing `group_by` and date
///
/// The result's only region column is `group_by`.
pub fn aggregate(table: &LongTable, group_by: &str) -> Result<LongTable> {
    table.region_index(group_by)?;
    let mut selection = vec![group_by.to_string(), DATE.to_string()];
    selection.extend(table.value_columns().iter().cloned());
    LongTable::from_frame(
        table.frame().select(selection)?,
        vec![group_by.to_string()],
        table.value_columns().to_vec(),
    )
}

/// Latest non-missing value of `column` for each region
pub fn latest_values(table: &LongTable, column: &str) -> Result<Vec<(Vec<String>, f64)>> {
    table.value_index(column)?;
    let key = columns(table.region_columns());
    let latest = table
        .frame()
        .clone()
        .lazy()
        .filter(col(column).is_not_null())
        .group_by(key.clone())
        .agg([col(column)
            .sort_by([col(DATE)], SortMultipleOptions::default())
            .last()])
        .sort_by_exprs(key, SortMultipleOptions::default())
        .collect()?;

    let regions = table
        .region_columns()
        .iter()
        .map(|c| text_values(&latest, c))
        .collect::<Result<Vec<_>>>()?;
    let values = number_values(&latest, column)?;
    Ok((0..latest.height())
        .filter_map(|i| {
            let region = regions
                .iter()
                .map(|ca| ca.get(i).unwrap_or_default().to_string())
                .collect();
            values.get(i).map(|v| (region, v))
        })
        .collect())
}

/// Aggregates by `group_by` and keeps the `n` groups with the highest latest `column`
///
/// Ties are broken by group name so the selection is deterministic.
pub fn select_top_regions(
    table: &LongTable,
    column: &str,
    n: usize,
    group_by: &str,
) -> Result<LongTable> {
    let grouped = aggregate(table, group_by)?;
    let mut ranked = latest_values(&grouped, column)?;
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);

    let keep: Vec<String> = ranked
        .into_iter()
        .filter_map(|(region, _)| region.into_iter().next())
        .collect();
    let keep: Vec<&str> = keep.iter().map(String::as_str).collect();
    let frame = grouped
        .frame()
        .clone()
        .lazy()
        .filter(any_of(group_by, &keep))
        .collect()?;
    Ok(grouped.with_frame(frame))
}

/// Adds `new_<column>`: the change from the previous row of the same region
///
/// A region's first row keeps its own value; a missing value on either side
/// gives a missing change.
pub fn calc_daily_change(table: &LongTable, column: &str) -> Result<LongTable> {
    table.value_index(column)?;
    let name = format!("new_{}", column);
    ensure_new_column(table, &name)?;

    let key = columns(table.region_columns());
    let first = col(DATE).eq(col(DATE).min().over(key.clone()));
    let previous = col(column).shift(lit(1)).over(key);
    let change = when(first)
        .then(col(column))
        .otherwise(col(column) - previous);
    table.with_value_column(&name, change)
}

/// Adds `mean_<column>_<days>d`: the trailing mean over the last `days` calendar days of a region
///
/// The window for a row covers dates after `date - days` up to and including
/// `date`, so gaps in the series shrink it. Missing values are skipped; a
/// window with no values gives a missing mean.
pub fn calc_rolling_mean(table: &LongTable, column: &str, days: usize) -> Result<LongTable> {
    if days == 0 {
        return Err(Error::InvalidParameter(
            "rolling window must be at least one day".to_string(),
        ));
    }
    table.value_index(column)?;
    let name = format!("mean_{}_{}d", column, days);
    ensure_new_column(table, &name)?;

    let window = RollingOptionsDynamicWindow {
        window_size: Duration::parse(&format!("{}d", days)),
        min_periods: 1,
        closed_window: ClosedWindow::Right,
        fn_params: None,
    };
    let key = columns(table.region_columns());
    let sum = col(column)
        .fill_null(lit(0.0))
        .rolling_sum_by(col(DATE), window.clone())
        .over(key.clone());
    let count = col(column)
        .is_not_null()
        .cast(DataType::Float64)
        .rolling_sum_by(col(DATE), window)
        .over(key);
    let mean = when(count.clone().gt(lit(0.0)))
        .then(sum / count)
        .otherwise(lit(NULL).cast(DataType::Float64));
    table.with_value_column(&name, mean)
}

/// Adds `days_since_<min>_<column>` and drops rows before each region first reached `min`
///
/// Regions that never reach `min` are dropped entirely.
pub fn calc_days_since_min_count(table: &LongTable, column: &str, min: f64) -> Result<LongTable> {
    table.value_index(column)?;
    let name = format!("days_since_{}_{}", min, column);
    ensure_new_column(table, &name)?;

    let key = columns(table.region_columns());
    let reached = col(DATE)
        .filter(col(column).gt_eq(lit(min)))
        .min()
        .over(key);
    let days = (col(DATE).cast(DataType::Int32) - col("first_reached").cast(DataType::Int32))
        .cast(DataType::Float64)
        .alias(name.as_str());

    let mut value_columns = table.value_columns().to_vec();
    value_columns.push(name);
    let mut order = row_key(table.region_columns());
    order.extend(columns(&value_columns));

    let frame = table
        .frame()
        .clone()
        .lazy()
        .with_column(reached.alias("first_reached"))
        .filter(col(DATE).gt_eq(col("first_reached")))
        .with_column(days)
        .select(order)
        .collect()?;
    Ok(LongTable::from_parts(
        frame,
        table.region_columns().to_vec(),
        value_columns,
    ))
}

/// Sums `column` across all regions for each date
pub fn totals_by_date(table: &LongTable, column: &str) -> Result<BTreeMap<NaiveDate, f64>> {
    table.value_index(column)?;
    let totals = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(DATE)])
        .agg([sum_present(column)])
        .collect()?;

    let dates = totals.column(DATE)?.date()?;
    let values = number_values(&totals, column)?;
    let mut out = BTreeMap::new();
    for i in 0..totals.height() {
        if let (Some(day), Some(total)) = (dates.get(i), values.get(i)) {
            out.insert(from_epoch_days(day)?, total);
        }
    }
    Ok(out)
}
