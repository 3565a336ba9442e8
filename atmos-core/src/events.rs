//! Upcoming campus events users can request a forecast for.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Academic,
    Sports,
    Cultural,
    Technical,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Academic => "academic",
            EventKind::Sports => "sports",
            EventKind::Cultural => "cultural",
            EventKind::Technical => "technical",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusEvent {
    pub id: String,
    pub name: String,
    pub date: String,
    pub time: String,
    pub kind: EventKind,
    pub location: String,
}

impl CampusEvent {
    fn new(id: &str, name: &str, date: &str, time: &str, kind: EventKind, location: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            kind,
            location: location.to_string(),
        }
    }

    /// Prompt asking for setup, main and teardown forecasts for this event.
    pub fn forecast_prompt(&self) -> String {
        format!(
            "/event Forecast for \"{}\" happening on {} at {} located at {}. \
             Give me a setup, main, and teardown weather guide.",
            self.name, self.date, self.time, self.location
        )
    }
}

/// Built-in event calendar.
pub fn campus_events() -> Vec<CampusEvent> {
    vec![
        CampusEvent::new(
            "1",
            "Inter-College Sports Meet",
            "March 15, 2024",
            "08:00 AM",
            EventKind::Sports,
            "Main Ground",
        ),
        CampusEvent::new(
            "2",
            "Jaya Shakthi Tech Expo",
            "March 18, 2024",
            "10:00 AM",
            EventKind::Technical,
            "Auditorium",
        ),
        CampusEvent::new(
            "3",
            "Cultural Night: SANGAM",
            "March 22, 2024",
            "05:30 PM",
            EventKind::Cultural,
            "Open Air Theater",
        ),
    ]
}

/// Look an event up by id.
pub fn find_event(id: &str) -> Option<CampusEvent> {
    campus_events().into_iter().find(|e| e.id == id.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_prompt_uses_event_command() {
        let event = find_event("3").expect("event 3 exists");
        let prompt = event.forecast_prompt();

        assert!(prompt.starts_with("/event Forecast for \"Cultural Night: SANGAM\""));
        assert!(prompt.contains("March 22, 2024 at 05:30 PM located at Open Air Theater"));
        assert!(prompt.ends_with("teardown weather guide."));
    }

    #[test]
    fn unknown_event_is_none() {
        assert!(find_event("42").is_none());
        assert_eq!(campus_events().len(), 3);
    }
}
