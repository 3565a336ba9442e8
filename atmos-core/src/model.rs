use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name used by the Gemini `contents` array.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// One message in the chat history. Fields are private so a turn cannot be
/// edited after it has been appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    role: Role,
    text: String,
    snapshot: Option<WeatherSnapshot>,
    sources: Vec<String>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into(), snapshot: None, sources: Vec::new() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into(), snapshot: None, sources: Vec::new() }
    }

    pub fn from_reply(reply: GatewayReply) -> Self {
        Self {
            role: Role::Assistant,
            text: reply.display_text,
            snapshot: reply.snapshot,
            sources: reply.sources,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

/// Structured weather record the model embeds in its reply.
///
/// Only `location` is mandatory. Every other text field tolerates absence and
/// numeric values, since models routinely write `"uvIndex": 7`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time_range: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub temperature: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rainfall: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub wind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sky_condition: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uv_index: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub air_quality: String,
    #[serde(default = "no_alerts", deserialize_with = "lenient_string")]
    pub alerts: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub forecast_summary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub activity_advice: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub confidence_level: String,
    /// Trend points, temperatures in Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<Vec<ChartPoint>>,
}

impl WeatherSnapshot {
    /// Alert text worth showing, if any. `"none"` in any case counts as no alert.
    pub fn active_alert(&self) -> Option<&str> {
        let alert = self.alerts.trim();
        if alert.is_empty() || alert.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(alert)
        }
    }
}

fn no_alerts() -> String {
    "none".to_string()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!("expected text, found {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: String,
    pub temp: f64,
}

/// Display preference for temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Fahrenheit => 'F',
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            TemperatureUnit::Celsius => TemperatureUnit::Fahrenheit,
            TemperatureUnit::Fahrenheit => TemperatureUnit::Celsius,
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'C' => Some(TemperatureUnit::Celsius),
            'F' => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "°{}", self.symbol())
    }
}

impl FromStr for TemperatureUnit {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!(
                "Unknown temperature unit '{value}'. Use 'c' (Celsius) or 'f' (Fahrenheit)."
            )),
        }
    }
}

/// What the gateway hands back for one successful call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GatewayReply {
    /// Model prose with the embedded JSON block removed.
    pub display_text: String,
    pub snapshot: Option<WeatherSnapshot>,
    /// Distinct citation URIs, in the order the provider listed them.
    pub sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_accepts_numeric_fields_and_defaults_alerts() {
        let snap: WeatherSnapshot = serde_json::from_str(
            r#"{"location":"Chennai","temperature":"30°C","uvIndex":7,"chartData":[{"time":"9am","temp":28.5}]}"#,
        )
        .expect("snapshot should parse");

        assert_eq!(snap.location, "Chennai");
        assert_eq!(snap.uv_index, "7");
        assert_eq!(snap.alerts, "none");
        assert!(snap.active_alert().is_none());
        assert_eq!(snap.chart_data.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn snapshot_requires_location() {
        let res = serde_json::from_str::<WeatherSnapshot>(r#"{"temperature":"30°C"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn active_alert_reports_real_alerts() {
        let snap: WeatherSnapshot =
            serde_json::from_str(r#"{"location":"Chennai","alerts":"Cyclone warning"}"#).unwrap();
        assert_eq!(snap.active_alert(), Some("Cyclone warning"));
    }

    #[test]
    fn unit_parsing_and_toggle() {
        assert_eq!("F".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!("celsius".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Celsius);
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
        assert_eq!(TemperatureUnit::Celsius.toggle(), TemperatureUnit::Fahrenheit);
        assert_eq!(TemperatureUnit::Fahrenheit.to_string(), "°F");
    }

    #[test]
    fn roles_map_to_gemini_names() {
        assert_eq!(Role::User.as_wire(), "user");
        assert_eq!(Role::Assistant.as_wire(), "model");
    }
}
