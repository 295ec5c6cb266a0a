//! Trend sparkline widget for one-line region summaries

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Block characters for different magnitudes (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A sparkline showing a series of counts, one cell per value
///
/// When the series is longer than the area, only the most recent values are
/// drawn.
pub struct TrendSparkline<'a> {
    /// Values in date order
    values: &'a [f64],
    /// Value drawn as a full block
    max_value: f64,
    /// Style for the sparkline
    style: Style,
    /// Style for the last (most recent) cell
    latest_style: Style,
}

impl<'a> TrendSparkline<'a> {
    pub fn new(values: &'a [f64], max_value: f64) -> Self {
        Self {
            values,
            max_value,
            style: Style::default().fg(Color::Cyan),
            latest_style: Style::default().fg(Color::Yellow),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn value_to_block(&self, value: f64) -> char {
        if self.max_value <= 0.0 {
            return BLOCKS[0];
        }
        let normalized = (value / self.max_value).clamp(0.0, 1.0);
        let index = ((normalized * 7.0).round() as usize).min(7);
        BLOCKS[index]
    }
}

impl<'a> Widget for TrendSparkline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.values.is_empty() {
            return;
        }

        let width = area.width as usize;
        let skip = self.values.len().saturating_sub(width);
        let last = self.values.len() - skip - 1;

        for (i, value) in self.values.iter().skip(skip).enumerate() {
            let block = self.value_to_block(*value);
            let x = area.x + i as u16;
            let y = area.y;

            let style = if i == last { self.latest_style } else { self.style };

            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(block).set_style(style);
            }
        }
    }
}
