use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Sparkline},
};

use crate::core::ops::Status;

pub fn usage_color(value: f64) -> Color {
    match value {
        v if v < 50.0 => Color::Cyan,
        v if v < 75.0 => Color::LightYellow,
        v if v < 90.0 => Color::LightRed,
        _ => Color::Red,
    }
}

/// Create a gauge with color based on value thresholds
pub fn colored_gauge<'a>(title: &'a str, value: f64, label: String) -> Gauge<'a> {
    Gauge::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .gauge_style(Style::default().fg(usage_color(value)).bg(Color::Black))
        .ratio((value / 100.0).clamp(0.0, 1.0))
        .label(label)
}

/// Sparkline over a percentage history scaled by ten (0..=1000)
pub fn percent_sparkline<'a>(title: String, data: Vec<u64>) -> Sparkline<'a> {
    let latest = data.last().copied().unwrap_or_default() as f64 / 10.0;
    Sparkline::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(data)
        .max(1000)
        .style(Style::default().fg(usage_color(latest)))
}

/// Get color for temperature value
pub fn temp_color(temp: f64) -> Color {
    match temp {
        t if t < 50.0 => Color::Cyan,
        t if t < 70.0 => Color::LightYellow,
        t if t < 85.0 => Color::LightRed,
        _ => Color::Red,
    }
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Success => Color::Green,
        Status::Warning => Color::Yellow,
        Status::Error => Color::Red,
    }
}
