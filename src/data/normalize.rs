//! CSV normalization into the standard table schema
//!
//! Upstream files rename columns from time to time (`Province/State` became
//! `Province_State`, `Long` became `Long_`), so every standard field is matched
//! against a list of aliases instead of a single header.
//!
//! Files are read with the polars CSV reader as string columns. Matched region
//! columns are renamed to their standard names, and for JHU-style files the
//! per-date columns are unpivoted into a `date` column.

use std::io::Cursor;

use chrono::NaiveDate;
use polars::prelude::*;

use super::table::{date_column, melt_dates, LongTable, Table, DATE};
use super::Shape;
use crate::error::{Error, Result};

/// Header formats recognised as dates, tried in order
const DATE_HEADER_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// A standard column and the upstream headers that map onto it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Standard column name in the normalized table
    pub name: &'static str,
    /// Upstream header spellings, matched case-insensitively
    pub aliases: &'static [&'static str],
    /// Whether normalization fails when no header matches
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: false,
        }
    }

    fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        header.eq_ignore_ascii_case(self.name)
            || self.aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
    }
}

/// How dates are laid out in the upstream file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// One column per date holding a single kind of count
    DateColumns { value: &'static str },
    /// A date column plus one column per kind of count
    DateRows { date: Field, values: Vec<Field> },
}

/// Mapping from an upstream file onto the standard schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Region fields in output column order
    pub regions: Vec<Field>,
    pub layout: Layout,
}

/// Parses a date from a header or cell in any of the accepted formats
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_HEADER_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_value(cell: &str, line: usize, column: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| {
        Error::Schema(format!(
            "line {}: column '{}' holds non-numeric value '{}'",
            line, column, cell
        ))
    })
}

/// Locates each field in the header, failing on missing required fields
///
/// Returns the matched fields paired with their header positions, in the
/// order the fields were given.
fn locate(fields: &[Field], headers: &[String]) -> Result<Vec<(Field, usize)>> {
    let mut located = Vec::new();
    for field in fields {
        match headers.iter().position(|h| field.matches(h)) {
            Some(idx) => located.push((*field, idx)),
            None if field.required => {
                return Err(Error::Schema(format!(
                    "required field '{}' not found (looked for {}); headers were: {}",
                    field.name,
                    std::iter::once(field.name)
                        .chain(field.aliases.iter().copied())
                        .collect::<Vec<_>>()
                        .join(", "),
                    headers.join(", ")
                )))
            }
            None => {}
        }
    }
    Ok(located)
}

/// Reads CSV text into a frame of string columns
fn read_frame(text: &str) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()?)
}

/// Trimmed cells of a string column, blank where missing
fn cells(frame: &DataFrame, idx: usize) -> Result<Vec<String>> {
    let column = frame
        .get_columns()
        .get(idx)
        .ok_or_else(|| Error::Schema(format!("column {} not present", idx)))?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().trim().to_string())
        .collect())
}

fn numeric_cells(frame: &DataFrame, idx: usize, column: &str) -> Result<Vec<Option<f64>>> {
    cells(frame, idx)?
        .iter()
        .enumerate()
        .map(|(row, cell)| parse_value(cell, row + 2, column))
        .collect()
}

/// Normalizes raw CSV text into a long table
pub fn normalize_long(text: &str, schema: &Schema) -> Result<LongTable> {
    let raw = read_frame(text)?;
    let headers: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|h| h.as_str().trim().to_string())
        .collect();

    let regions = locate(&schema.regions, &headers)?;
    let region_columns: Vec<String> = regions.iter().map(|(f, _)| f.name.to_string()).collect();
    let mut frame_columns = Vec::new();
    for (field, idx) in &regions {
        frame_columns.push(Column::new(field.name.into(), cells(&raw, *idx)?));
    }

    match &schema.layout {
        Layout::DateColumns { value } => {
            let date_columns: Vec<(usize, NaiveDate)> = headers
                .iter()
                .enumerate()
                .filter_map(|(i, h)| parse_date(h).map(|d| (i, d)))
                .collect();
            if date_columns.is_empty() {
                return Err(Error::Schema(format!(
                    "no date columns found; headers were: {}",
                    headers.join(", ")
                )));
            }

            let mut date_headers = Vec::with_capacity(date_columns.len());
            for (idx, date) in &date_columns {
                let header = &headers[*idx];
                let values = numeric_cells(&raw, *idx, header)?;
                frame_columns.push(Column::new(header.as_str().into(), values));
                date_headers.push((header.clone(), *date));
            }

            let wide = DataFrame::new(frame_columns)?;
            let long = melt_dates(&wide, &region_columns, &date_headers, value)?;
            LongTable::from_frame(long, region_columns, vec![value.to_string()])
        }
        Layout::DateRows { date, values } => {
            let (_, date_idx) = locate(std::slice::from_ref(date), &headers)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::Schema(format!("date field '{}' not found", date.name)))?;
            let value_fields = locate(values, &headers)?;
            if value_fields.is_empty() {
                return Err(Error::Schema(format!(
                    "no value columns found; headers were: {}",
                    headers.join(", ")
                )));
            }

            let dates = cells(&raw, date_idx)?
                .iter()
                .enumerate()
                .map(|(row, cell)| {
                    parse_date(cell).ok_or_else(|| {
                        Error::Schema(format!("line {}: unrecognised date '{}'", row + 2, cell))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            frame_columns.push(date_column(DATE, &dates)?);

            let mut value_columns = Vec::with_capacity(value_fields.len());
            for (field, idx) in &value_fields {
                let values = numeric_cells(&raw, *idx, field.name)?;
                frame_columns.push(Column::new(field.name.into(), values));
                value_columns.push(field.name.to_string());
            }

            LongTable::from_frame(DataFrame::new(frame_columns)?, region_columns, value_columns)
        }
    }
}

/// Normalizes raw CSV text into a table of the requested shape
pub fn normalize(text: &str, schema: &Schema, shape: Shape) -> Result<Table> {
    Table::from_long(normalize_long(text, schema)?, shape)
}
