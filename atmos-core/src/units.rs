//! Temperature formatting between Celsius and Fahrenheit.

use regex::Regex;
use std::sync::LazyLock;

use crate::model::{ChartPoint, TemperatureUnit};

// A sign only counts when it does not directly follow another number, so in a
// range like "28-32°C" the reading is 32, not -32.
static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9.])([+-]?\d+(?:\.\d+)?)\s*°?\s*([CF])")
        .expect("temperature pattern is valid")
});

/// Render a temperature string such as `"32°C"` in `target`.
///
/// Text without a recognisable `<number>[°]<C|F>` pattern comes back unchanged.
/// For a range such as `"28-32°C"` only the reading carrying the unit is used.
/// Same-unit input keeps its value and only normalises the suffix; converted
/// values are rounded to whole degrees.
pub fn format_temperature(text: &str, target: TemperatureUnit) -> String {
    let Some(caps) = TEMPERATURE.captures(text) else {
        return text.to_string();
    };

    let Ok(value) = caps[1].parse::<f64>() else {
        return text.to_string();
    };
    let Some(source) = caps[2].chars().next().and_then(TemperatureUnit::from_symbol) else {
        return text.to_string();
    };

    if source == target {
        return format!("{value}{target}");
    }

    let converted = match target {
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(value),
        TemperatureUnit::Celsius => fahrenheit_to_celsius(value),
    };

    format!("{}{target}", round_half_up(converted))
}

/// Convert a Celsius reading for display in `unit`.
pub fn convert_celsius(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => round_half_up(celsius_to_fahrenheit(celsius)) as f64,
    }
}

/// Chart series as displayed in `unit`. Stored points are Celsius and are never
/// modified; each call recomputes every point.
pub fn chart_in_unit(points: &[ChartPoint], unit: TemperatureUnit) -> Vec<ChartPoint> {
    points
        .iter()
        .map(|p| ChartPoint { time: p.time.clone(), temp: convert_celsius(p.temp, unit) })
        .collect()
}

fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

// Halves round towards positive infinity, so -2.5 becomes -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use TemperatureUnit::{Celsius, Fahrenheit};

    fn number_in(text: &str) -> f64 {
        TEMPERATURE.captures(text).unwrap()[1].parse().unwrap()
    }

    #[test]
    fn celsius_to_fahrenheit_rounds() {
        assert_eq!(format_temperature("32°C", Fahrenheit), "90°F");
        assert_eq!(format_temperature("0°C", Fahrenheit), "32°F");
        assert_eq!(format_temperature("-40°C", Fahrenheit), "-40°F");
    }

    #[test]
    fn fahrenheit_to_celsius_rounds() {
        assert_eq!(format_temperature("212°F", Celsius), "100°C");
        assert_eq!(format_temperature("90°F", Celsius), "32°C");
    }

    #[test]
    fn accepts_missing_degree_sign_and_lowercase() {
        assert_eq!(format_temperature("Around 30 c today", Fahrenheit), "86°F");
        assert_eq!(format_temperature("86f", Celsius), "30°C");
        assert_eq!(format_temperature("+20°C", Fahrenheit), "68°F");
    }

    #[test]
    fn range_uses_reading_next_to_unit() {
        assert_eq!(format_temperature("28-32°C", Fahrenheit), "90°F");
        assert_eq!(format_temperature("28 - 32°C", Fahrenheit), "90°F");
        assert_eq!(format_temperature("28–32°C", Fahrenheit), "90°F");
        assert_eq!(format_temperature("Lows of -5°C", Fahrenheit), "23°F");
    }

    #[test]
    fn same_unit_normalises_suffix_only() {
        assert_eq!(format_temperature("32.5 °c", Celsius), "32.5°C");
        assert_eq!(format_temperature("31C", Celsius), "31°C");
    }

    #[test]
    fn unmatched_text_passes_through() {
        assert_eq!(format_temperature("Warm and humid", Fahrenheit), "Warm and humid");
        assert_eq!(format_temperature("", Celsius), "");
    }

    #[test]
    fn same_unit_is_idempotent() {
        for input in ["32°C", "-3.5C", "98.6°F", "0 f"] {
            for unit in [Celsius, Fahrenheit] {
                let once = format_temperature(input, unit);
                let twice = format_temperature(&once, unit);
                assert_eq!(number_in(&once), number_in(&twice), "input {input} unit {unit}");
            }
        }
    }

    #[test]
    fn celsius_round_trip_loses_at_most_one_degree() {
        for c in -50..=50 {
            let f = format_temperature(&format!("{c}°C"), Fahrenheit);
            let back = format_temperature(&f, Celsius);
            let diff = (number_in(&back) - c as f64).abs();
            assert!(diff <= 1.0, "{c}°C -> {f} -> {back}");
        }
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(round_half_up(89.6), 90);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
    }

    #[test]
    fn chart_points_convert_without_touching_source() {
        let stored = vec![ChartPoint { time: "9am".into(), temp: 20.0 }];

        let shown = chart_in_unit(&stored, Fahrenheit);
        assert_eq!(shown, vec![ChartPoint { time: "9am".into(), temp: 68.0 }]);
        assert_eq!(stored[0].temp, 20.0);

        assert_eq!(chart_in_unit(&stored, Celsius), stored);
    }
}
