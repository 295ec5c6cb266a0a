//! Text charts rendered from long tables
//!
//! Charts are drawn with ratatui widgets into an off-screen [`Buffer`], which
//! can then be turned into plain text or printed to a terminal with colors.

mod sparkline;

pub use sparkline::TrendSparkline;

use std::io::{self, Write};

use chrono::NaiveDate;
use crossterm::{
    queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
use ratatui::{
    buffer::Buffer,
    layout::{Direction, Rect},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Chart, Dataset, GraphType, Widget},
};

use crate::data::table::{LongTable, DATE_FORMAT};
use crate::error::{Error, Result};
use crate::select::latest_values;

/// Colors cycled through for line series
const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::Red,
    Color::Blue,
];

const MIN_WIDTH: u16 = 20;
const MIN_HEIGHT: u16 = 5;

/// Size and title of a rendered chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOptions {
    pub title: String,
    pub width: u16,
    pub height: u16,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 100,
            height: 30,
        }
    }
}

impl ChartOptions {
    fn area(&self) -> Result<Rect> {
        if self.width < MIN_WIDTH || self.height < MIN_HEIGHT {
            return Err(Error::InvalidParameter(format!(
                "chart must be at least {}x{}, got {}x{}",
                MIN_WIDTH, MIN_HEIGHT, self.width, self.height
            )));
        }
        Ok(Rect::new(0, 0, self.width, self.height))
    }
}

/// Display label for a region, skipping blank parts
pub fn region_label(region: &[String]) -> String {
    let parts: Vec<&str> = region
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        "(unnamed)".to_string()
    } else {
        parts.join(", ")
    }
}

fn series_color(i: usize) -> Color {
    SERIES_COLORS[i % SERIES_COLORS.len()]
}

/// Draws one line per region of `column` over time
pub fn line_chart(table: &LongTable, column: &str, options: &ChartOptions) -> Result<Buffer> {
    let area = options.area()?;
    let idx = table.value_index(column)?;
    let dates = table.dates()?;
    let (first, last) = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Error::Lookup("no rows to plot".to_string())),
    };

    let mut series: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
    for row in table.rows()? {
        let Some(value) = row.values[idx] else {
            continue;
        };
        let label = region_label(&row.region);
        let point = ((row.date - first).num_days() as f64, value);
        match series.last_mut() {
            Some((name, points)) if *name == label => points.push(point),
            _ => series.push((label, vec![point])),
        }
    }

    let max_y = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|p| p.1))
        .fold(0.0_f64, f64::max);
    let y_max = if max_y > 0.0 { max_y * 1.05 } else { 1.0 };
    let x_max = ((last - first).num_days() as f64).max(1.0);
    let middle = first + chrono::Duration::days((last - first).num_days() / 2);

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(series_color(i)))
                .data(points)
        })
        .collect();

    let date_label = |d: NaiveDate| Span::raw(d.format(DATE_FORMAT).to_string());
    let chart = Chart::new(datasets)
        .block(Block::bordered().title(options.title.clone()))
        .x_axis(
            Axis::default()
                .title("Date")
                .bounds([0.0, x_max])
                .labels(vec![date_label(first), date_label(middle), date_label(last)]),
        )
        .y_axis(
            Axis::default()
                .title(column.to_string())
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", y_max / 2.0)),
                    Span::raw(format!("{:.0}", y_max)),
                ]),
        );

    let mut buf = Buffer::empty(area);
    chart.render(area, &mut buf);
    Ok(buf)
}

/// Draws one horizontal bar per region holding its latest `column` value
///
/// Bars are ordered from the largest value down.
pub fn bar_chart(table: &LongTable, column: &str, options: &ChartOptions) -> Result<Buffer> {
    let area = options.area()?;
    let mut latest = latest_values(table, column)?;
    if latest.is_empty() {
        return Err(Error::Lookup(format!("no '{}' values to plot", column)));
    }
    latest.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let bars: Vec<Bar> = latest
        .iter()
        .map(|(region, value)| {
            Bar::default()
                .label(region_label(region).into())
                .value(value.max(0.0).round() as u64)
                .text_value(format!("{:.0}", value))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::bordered().title(options.title.clone()))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(BarGroup::default().bars(&bars));

    let mut buf = Buffer::empty(area);
    chart.render(area, &mut buf);
    Ok(buf)
}

/// Draws one sparkline row per region: label, sparkline, latest value
pub fn sparklines(table: &LongTable, column: &str, options: &ChartOptions) -> Result<Buffer> {
    let area = options.area()?;
    let idx = table.value_index(column)?;

    let mut series: Vec<(String, Vec<f64>)> = Vec::new();
    for row in table.rows()? {
        let label = region_label(&row.region);
        let value = row.values[idx].unwrap_or(0.0);
        match series.last_mut() {
            Some((name, values)) if *name == label => values.push(value),
            _ => series.push((label, vec![value])),
        }
    }
    if series.is_empty() {
        return Err(Error::Lookup("no rows to plot".to_string()));
    }

    let label_width = series
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .min(area.width as usize / 3) as u16;
    let value_width: u16 = 12;
    let spark_width = area.width.saturating_sub(label_width + value_width + 2);

    let mut buf = Buffer::empty(area);
    for (row, (name, values)) in series.iter().take(area.height as usize).enumerate() {
        let y = row as u16;
        let max = values.iter().copied().fold(0.0_f64, f64::max);
        buf.set_stringn(0, y, name, label_width as usize, Style::default());
        TrendSparkline::new(values, max).render(
            Rect::new(label_width + 1, y, spark_width, 1),
            &mut buf,
        );
        if let Some(latest) = values.last() {
            buf.set_stringn(
                label_width + spark_width + 2,
                y,
                format!("{:.0}", latest),
                value_width as usize,
                Style::default(),
            );
        }
    }
    Ok(buf)
}

/// Converts a rendered buffer into plain text, one line per row
pub fn buffer_to_string(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            if let Some(cell) = buf.cell((x, y)) {
                line.push_str(cell.symbol());
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn terminal_color(color: Color) -> Option<TermColor> {
    match color {
        Color::Black => Some(TermColor::Black),
        Color::Red => Some(TermColor::DarkRed),
        Color::Green => Some(TermColor::DarkGreen),
        Color::Yellow => Some(TermColor::DarkYellow),
        Color::Blue => Some(TermColor::DarkBlue),
        Color::Magenta => Some(TermColor::DarkMagenta),
        Color::Cyan => Some(TermColor::DarkCyan),
        Color::Gray => Some(TermColor::Grey),
        Color::White => Some(TermColor::White),
        _ => None,
    }
}

/// Writes a rendered buffer to a terminal, keeping foreground and background colors
pub fn print_buffer<W: Write>(buf: &Buffer, out: &mut W) -> io::Result<()> {
    let area = buf.area;
    for y in area.top()..area.bottom() {
        let mut current: (Option<TermColor>, Option<TermColor>) = (None, None);
        for x in area.left()..area.right() {
            let Some(cell) = buf.cell((x, y)) else {
                continue;
            };
            let colors = (terminal_color(cell.fg), terminal_color(cell.bg));
            if colors != current {
                queue!(out, ResetColor)?;
                if let Some(fg) = colors.0 {
                    queue!(out, SetForegroundColor(fg))?;
                }
                if let Some(bg) = colors.1 {
                    queue!(out, SetBackgroundColor(bg))?;
                }
                current = colors;
            }
            queue!(out, Print(cell.symbol()))?;
        }
        queue!(out, ResetColor, Print("\n"))?;
    }
    out.flush()
}
