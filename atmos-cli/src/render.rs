//! Plain-text rendering of turns, weather cards and the temperature trend.

use std::fmt::Write as _;

use atmos_core::{
    CampusEvent, ChartPoint, ConversationTurn, Role, TemperatureUnit, WeatherSnapshot,
    format_temperature, units::chart_in_unit,
};

const BAR_WIDTH: usize = 30;
// Chart axis is padded this far beyond the data on both ends.
const AXIS_PADDING: f64 = 5.0;

pub fn turn(turn: &ConversationTurn) -> String {
    let speaker = match turn.role() {
        Role::User => "you",
        Role::Assistant => "atmos",
    };

    let mut out = format!("{speaker}> {}\n", turn.text());
    if !turn.sources().is_empty() {
        out.push_str("\nSources:\n");
        for uri in turn.sources() {
            let _ = writeln!(out, "  - {uri}");
        }
    }
    out
}

pub fn card(snapshot: &WeatherSnapshot, unit: TemperatureUnit) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "┌─ {} ({})", snapshot.location.to_uppercase(), snapshot.time_range);
    let _ = writeln!(out, "│ {}", format_temperature(&snapshot.temperature, unit));
    let _ = writeln!(
        out,
        "│ {} · Confidence: {}",
        snapshot.sky_condition, snapshot.confidence_level
    );
    let _ = writeln!(out, "│");
    for (label, value) in [
        ("Rainfall", &snapshot.rainfall),
        ("Wind", &snapshot.wind),
        ("UV Index", &snapshot.uv_index),
        ("Air Quality", &snapshot.air_quality),
    ] {
        let _ = writeln!(out, "│ {label:<12} {value}");
    }

    if let Some(alert) = snapshot.active_alert() {
        let _ = writeln!(out, "│\n│ ⚠ {alert}");
    }

    if let Some(points) = snapshot.chart_data.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "│\n│ Temperature Trend ({unit})");
        for line in chart(points, unit).lines() {
            let _ = writeln!(out, "│ {line}");
        }
    }

    let _ = writeln!(out, "│\n│ Forecast Summary\n│   {}", snapshot.forecast_summary);
    let _ = writeln!(out, "│ Activity Advice\n│   {}", snapshot.activity_advice);
    out.push('└');
    out.push('\n');
    out
}

/// Horizontal bar chart of Celsius `points`, shown in `unit`.
pub fn chart(points: &[ChartPoint], unit: TemperatureUnit) -> String {
    let shown = chart_in_unit(points, unit);

    let min = shown.iter().map(|p| p.temp).fold(f64::INFINITY, f64::min) - AXIS_PADDING;
    let max = shown.iter().map(|p| p.temp).fold(f64::NEG_INFINITY, f64::max) + AXIS_PADDING;
    let span = (max - min).max(f64::EPSILON);
    let label_width = shown.iter().map(|p| p.time.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    for point in &shown {
        let filled = (((point.temp - min) / span) * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "{:<label_width$} {}{} {}{unit}",
            point.time,
            "█".repeat(filled),
            " ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
            point.temp,
        );
    }
    out
}

pub fn events(events: &[CampusEvent]) -> String {
    let mut out = String::from("Upcoming Campus Events\n");
    for event in events {
        let _ = writeln!(
            out,
            "  [{}] {} ({}) {} at {} · {}",
            event.id, event.name, event.kind, event.date, event.time, event.location
        );
    }
    out
}
