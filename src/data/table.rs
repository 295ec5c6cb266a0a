//! Normalized table types
//!
//! Tables wrap a polars [`DataFrame`]. A long frame holds the region columns,
//! a `date` column and the value columns, in that order, with one row per
//! (region, date) sorted by region then date. A wide frame holds the region
//! columns followed by one column per date for a single kind of count.

use std::io::Write;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use super::Shape;
use crate::error::{Error, Result};

/// Date format used when writing tables and naming wide columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Name of the date column of a long table
pub const DATE: &str = "date";

/// Days from 0001-01-01 to 1970-01-01, the epoch of polars dates
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

pub(crate) fn from_epoch_days(days: i32) -> Result<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
        .ok_or_else(|| Error::Schema(format!("date {} days from epoch is out of range", days)))
}

pub(crate) fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Column> {
    let days: Vec<i32> = dates.iter().map(|d| epoch_days(*d)).collect();
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}

/// Column expressions for a list of names
pub(crate) fn columns(names: &[String]) -> Vec<Expr> {
    names.iter().map(|n| col(n.as_str())).collect()
}

/// Region columns followed by the date column, the key of a long row
pub(crate) fn row_key(region_columns: &[String]) -> Vec<Expr> {
    let mut key = columns(region_columns);
    key.push(col(DATE));
    key
}

/// Sum of a group that stays missing when every value in it is missing
pub(crate) fn sum_present(name: &str) -> Expr {
    when(col(name).count().gt(lit(0)))
        .then(col(name).sum())
        .otherwise(lit(NULL).cast(DataType::Float64))
        .alias(name)
}

pub(crate) fn text_values<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    Ok(frame.column(name)?.str()?)
}

pub(crate) fn number_values<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Float64Chunked> {
    Ok(frame.column(name)?.f64()?)
}

pub(crate) fn date_values(frame: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let dates = frame.column(name)?.date()?;
    (0..frame.height())
        .map(|i| {
            dates
                .get(i)
                .ok_or_else(|| Error::Schema(format!("row {} has no date", i)))
                .and_then(from_epoch_days)
        })
        .collect()
}

/// Builds a long frame from column-major data
pub(crate) fn long_frame(
    region_columns: &[String],
    regions: Vec<Vec<String>>,
    dates: &[NaiveDate],
    value_columns: &[String],
    values: Vec<Vec<Option<f64>>>,
) -> Result<DataFrame> {
    let mut frame_columns = Vec::with_capacity(region_columns.len() + value_columns.len() + 1);
    for (name, data) in region_columns.iter().zip(regions) {
        frame_columns.push(Column::new(name.as_str().into(), data));
    }
    frame_columns.push(date_column(DATE, dates)?);
    for (name, data) in value_columns.iter().zip(values) {
        frame_columns.push(Column::new(name.as_str().into(), data));
    }
    Ok(DataFrame::new(frame_columns)?)
}

/// Unpivots date-named value columns into a long frame
///
/// `headers` pairs each value column of `frame` with the date it holds. Every
/// cell becomes a row, missing ones included.
pub(crate) fn melt_dates(
    frame: &DataFrame,
    region_columns: &[String],
    headers: &[(String, NaiveDate)],
    value_column: &str,
) -> Result<DataFrame> {
    if headers.is_empty() {
        return long_frame(
            region_columns,
            vec![Vec::new(); region_columns.len()],
            &[],
            &[value_column.to_string()],
            vec![Vec::new()],
        );
    }

    let names: Vec<String> = headers.iter().map(|(h, _)| h.clone()).collect();
    let dates: Vec<NaiveDate> = headers.iter().map(|(_, d)| *d).collect();
    let melted = frame.unpivot(names.clone(), region_columns.to_vec())?;
    let lookup = DataFrame::new(vec![
        Column::new("variable".into(), names),
        date_column(DATE, &dates)?,
    ])?;

    let mut selection = row_key(region_columns);
    selection.push(col("value").cast(DataType::Float64).alias(value_column));
    Ok(melted
        .lazy()
        .join(
            lookup.lazy(),
            [col("variable")],
            [col("variable")],
            JoinArgs::new(JoinType::Inner),
        )
        .select(selection)
        .collect()?)
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One observation of a long table
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    /// Values of the table's region columns, in column order
    pub region: Vec<String>,
    pub date: NaiveDate,
    /// Values of the table's value columns, in column order
    pub values: Vec<Option<f64>>,
}

/// Table with one row per region per date
#[derive(Debug, Clone)]
pub struct LongTable {
    frame: DataFrame,
    region_columns: Vec<String>,
    value_columns: Vec<String>,
}

/// One region of a wide table
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub region: Vec<String>,
    /// One value per entry of [`WideTable::dates`]
    pub values: Vec<Option<f64>>,
}

/// Table with one column per date for a single value column
#[derive(Debug, Clone)]
pub struct WideTable {
    frame: DataFrame,
    region_columns: Vec<String>,
    value_column: String,
    dates: Vec<NaiveDate>,
}

/// A normalized table in either shape
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    Long(LongTable),
    Wide(WideTable),
}

impl PartialEq for LongTable {
    fn eq(&self, other: &Self) -> bool {
        self.region_columns == other.region_columns
            && self.value_columns == other.value_columns
            && self.frame.equals_missing(&other.frame)
    }
}

impl PartialEq for WideTable {
    fn eq(&self, other: &Self) -> bool {
        self.region_columns == other.region_columns
            && self.value_column == other.value_column
            && self.dates == other.dates
            && self.frame.equals_missing(&other.frame)
    }
}

impl LongTable {
    pub fn new(region_columns: Vec<String>, value_columns: Vec<String>) -> Result<Self> {
        let frame = long_frame(
            &region_columns,
            vec![Vec::new(); region_columns.len()],
            &[],
            &value_columns,
            vec![Vec::new(); value_columns.len()],
        )?;
        Ok(Self {
            frame,
            region_columns,
            value_columns,
        })
    }

    /// Builds a table from raw observations
    ///
    /// Observations sharing a region and date are summed into a single row, and
    /// rows come out ordered by region then date.
    pub fn from_observations<I>(
        region_columns: Vec<String>,
        value_columns: Vec<String>,
        observations: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<String>, NaiveDate, Vec<Option<f64>>)>,
    {
        let mut regions: Vec<Vec<String>> = vec![Vec::new(); region_columns.len()];
        let mut dates = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); value_columns.len()];
        for (region, date, row_values) in observations {
            if region.len() != region_columns.len() {
                return Err(Error::Schema(format!(
                    "observation has {} region values for {} region columns",
                    region.len(),
                    region_columns.len()
                )));
            }
            for (column, value) in regions.iter_mut().zip(region) {
                column.push(value);
            }
            dates.push(date);
            for (i, column) in values.iter_mut().enumerate() {
                column.push(row_values.get(i).copied().flatten());
            }
        }

        let frame = long_frame(&region_columns, regions, &dates, &value_columns, values)?;
        Self::from_frame(frame, region_columns, value_columns)
    }

    /// Wraps a frame with the given columns, summing duplicate rows and sorting
    pub fn from_frame(
        frame: DataFrame,
        region_columns: Vec<String>,
        value_columns: Vec<String>,
    ) -> Result<Self> {
        let key = row_key(&region_columns);
        let sums: Vec<Expr> = value_columns.iter().map(|c| sum_present(c)).collect();
        let frame = frame
            .lazy()
            .group_by(key.clone())
            .agg(sums)
            .sort_by_exprs(key, SortMultipleOptions::default())
            .collect()?;
        Ok(Self {
            frame,
            region_columns,
            value_columns,
        })
    }

    /// Wraps a frame that is already in row order with one row per key
    pub(crate) fn from_parts(
        frame: DataFrame,
        region_columns: Vec<String>,
        value_columns: Vec<String>,
    ) -> Self {
        Self {
            frame,
            region_columns,
            value_columns,
        }
    }

    /// Same columns over a frame already in row order
    pub(crate) fn with_frame(&self, frame: DataFrame) -> Self {
        Self::from_parts(
            frame,
            self.region_columns.clone(),
            self.value_columns.clone(),
        )
    }

    /// Adds a derived value column produced by a frame expression
    pub(crate) fn with_value_column(&self, name: &str, expr: Expr) -> Result<Self> {
        let frame = self
            .frame
            .clone()
            .lazy()
            .with_column(expr.alias(name))
            .collect()?;
        let mut value_columns = self.value_columns.clone();
        value_columns.push(name.to_string());
        Ok(Self {
            frame,
            region_columns: self.region_columns.clone(),
            value_columns,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn region_columns(&self) -> &[String] {
        &self.region_columns
    }

    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of a region column
    pub fn region_index(&self, column: &str) -> Result<usize> {
        self.region_columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                Error::Lookup(format!(
                    "region column '{}' not present; available: {}",
                    column,
                    self.region_columns.join(", ")
                ))
            })
    }

    /// Position of a value column
    pub fn value_index(&self, column: &str) -> Result<usize> {
        self.value_columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                Error::Lookup(format!(
                    "value column '{}' not present; available: {}",
                    column,
                    self.value_columns.join(", ")
                ))
            })
    }

    /// Rows in table order
    pub fn rows(&self) -> Result<Vec<LongRow>> {
        let regions = self
            .region_columns
            .iter()
            .map(|c| text_values(&self.frame, c))
            .collect::<Result<Vec<_>>>()?;
        let values = self
            .value_columns
            .iter()
            .map(|c| number_values(&self.frame, c))
            .collect::<Result<Vec<_>>>()?;
        let dates = date_values(&self.frame, DATE)?;

        Ok(dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| LongRow {
                region: regions
                    .iter()
                    .map(|ca| ca.get(i).unwrap_or_default().to_string())
                    .collect(),
                date,
                values: values.iter().map(|ca| ca.get(i)).collect(),
            })
            .collect())
    }

    /// Distinct dates in ascending order
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = date_values(&self.frame, DATE)?;
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }

    /// Distinct regions in ascending order
    pub fn regions(&self) -> Result<Vec<Vec<String>>> {
        let mut regions: Vec<Vec<String>> =
            self.rows()?.into_iter().map(|r| r.region).collect();
        regions.dedup();
        Ok(regions)
    }

    /// Outer-joins another table's value columns onto this one by region and date
    ///
    /// Both tables must have the same region columns and no value column in
    /// common.
    pub fn join(self, other: LongTable) -> Result<LongTable> {
        if self.region_columns != other.region_columns {
            return Err(Error::Schema(format!(
                "cannot join tables with region columns [{}] and [{}]",
                self.region_columns.join(", "),
                other.region_columns.join(", ")
            )));
        }
        if let Some(dup) = other
            .value_columns
            .iter()
            .find(|c| self.value_columns.contains(c))
        {
            return Err(Error::Schema(format!(
                "value column '{}' appears in both tables",
                dup
            )));
        }

        let mut value_columns = self.value_columns;
        value_columns.extend(other.value_columns);
        let key = row_key(&self.region_columns);
        let mut order = key.clone();
        order.extend(columns(&value_columns));

        let frame = self
            .frame
            .lazy()
            .join(
                other.frame.lazy(),
                key.clone(),
                key.clone(),
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            )
            .select(order)
            .sort_by_exprs(key, SortMultipleOptions::default())
            .collect()?;

        Ok(LongTable {
            frame,
            region_columns: self.region_columns,
            value_columns,
        })
    }

    /// Keeps only the named value columns, in the order given
    pub fn project_values(&self, names: &[&str]) -> Result<LongTable> {
        for name in names {
            self.value_index(name)?;
        }
        let value_columns: Vec<String> = names.iter().map(|c| c.to_string()).collect();
        let mut selection = self.region_columns.clone();
        selection.push(DATE.to_string());
        selection.extend(value_columns.iter().cloned());

        Ok(LongTable {
            frame: self.frame.select(selection)?,
            region_columns: self.region_columns.clone(),
            value_columns,
        })
    }

    /// Pivots one value column into a wide table with one column per date
    pub fn to_wide(&self, value_column: &str) -> Result<WideTable> {
        self.value_index(value_column)?;
        let dates = self.dates()?;
        let cells: Vec<Expr> = dates
            .iter()
            .map(|d| {
                col(value_column)
                    .filter(col(DATE).cast(DataType::Int32).eq(lit(epoch_days(*d))))
                    .first()
                    .alias(d.format(DATE_FORMAT).to_string())
            })
            .collect();
        let key = columns(&self.region_columns);

        let frame = self
            .frame
            .clone()
            .lazy()
            .group_by(key.clone())
            .agg(cells)
            .sort_by_exprs(key, SortMultipleOptions::default())
            .collect()?;

        Ok(WideTable {
            frame,
            region_columns: self.region_columns.clone(),
            value_column: value_column.to_string(),
            dates,
        })
    }

    /// Writes the table as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = vec![DATE.to_string()];
        header.extend(self.region_columns.iter().cloned());
        header.extend(self.value_columns.iter().cloned());
        out.write_record(&header)?;

        for row in self.rows()? {
            let mut record = vec![row.date.format(DATE_FORMAT).to_string()];
            record.extend(row.region);
            record.extend(row.values.iter().map(|v| format_value(*v)));
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl WideTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn region_columns(&self) -> &[String] {
        &self.region_columns
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn date_headers(&self) -> Vec<(String, NaiveDate)> {
        self.dates
            .iter()
            .map(|d| (d.format(DATE_FORMAT).to_string(), *d))
            .collect()
    }

    /// Rows in table order
    pub fn rows(&self) -> Result<Vec<WideRow>> {
        let regions = self
            .region_columns
            .iter()
            .map(|c| text_values(&self.frame, c))
            .collect::<Result<Vec<_>>>()?;
        let cells = self
            .date_headers()
            .iter()
            .map(|(h, _)| number_values(&self.frame, h))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..self.len())
            .map(|i| WideRow {
                region: regions
                    .iter()
                    .map(|ca| ca.get(i).unwrap_or_default().to_string())
                    .collect(),
                values: cells.iter().map(|ca| ca.get(i)).collect(),
            })
            .collect())
    }

    /// Melts the date columns into one row per region per date
    ///
    /// Cells that are missing in the wide table produce no long row.
    pub fn to_long(&self) -> Result<LongTable> {
        let melted = melt_dates(
            &self.frame,
            &self.region_columns,
            &self.date_headers(),
            &self.value_column,
        )?;
        let present = melted
            .lazy()
            .filter(col(self.value_column.as_str()).is_not_null())
            .collect()?;
        LongTable::from_frame(
            present,
            self.region_columns.clone(),
            vec![self.value_column.clone()],
        )
    }

    /// Writes the table as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = self.region_columns.clone();
        header.extend(self.date_headers().into_iter().map(|(h, _)| h));
        out.write_record(&header)?;

        for row in self.rows()? {
            let mut record = row.region;
            record.extend(row.values.iter().map(|v| format_value(*v)));
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Table {
    /// Shapes a long table, pivoting it when the wide shape is requested
    ///
    /// A wide table holds a single kind of count, so the wide shape of a table
    /// with several value columns is an invalid parameter.
    pub fn from_long(long: LongTable, shape: Shape) -> Result<Table> {
        match shape {
            Shape::Long => Ok(Table::Long(long)),
            Shape::Wide => match long.value_columns() {
                [only] => Ok(Table::Wide(long.to_wide(only)?)),
                names => Err(Error::InvalidParameter(format!(
                    "wide format needs exactly one value column, found {}",
                    names.join(", ")
                ))),
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Table::Long(t) => t.len(),
            Table::Wide(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the table in long form, melting it if necessary
    pub fn into_long(self) -> Result<LongTable> {
        match self {
            Table::Long(t) => Ok(t),
            Table::Wide(t) => t.to_long(),
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        match self {
            Table::Long(t) => t.write_csv(writer),
            Table::Wide(t) => t.write_csv(writer),
        }
    }
}
