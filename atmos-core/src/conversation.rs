//! Chat history, the current weather snapshot, and the request lifecycle.
//!
//! A conversation is `Idle` until a message is submitted, then `Sending` (or
//! `Locating` while the device position resolves first) until the gateway
//! answers. Only one request may be outstanding; further submissions are
//! rejected without touching state.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    events::CampusEvent,
    gateway::{GatewayError, ModelGateway},
    location::{Coordinates, LocationError, LocationSource},
    model::{ConversationTurn, GatewayReply, TemperatureUnit, WeatherSnapshot},
    prompt,
};

pub const CONNECTION_ERROR: &str =
    "ATMOS is currently experiencing connection issues. Please try again later.";
pub const LOCATION_DENIED: &str =
    "Unable to retrieve your location. Please check your location permissions.";
pub const LOCATION_UNSUPPORTED: &str = "Geolocation is not supported on this device.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Locating,
    Sending,
}

/// How a submitted request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An assistant turn was appended.
    Settled,
    /// The error message is set and no assistant turn was appended.
    Failed,
}

/// Submissions refused before anything was sent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a request is already in progress")]
    Busy,
    #[error("no request is in progress")]
    NotPending,
}

/// Ticket for one outstanding gateway call, handed out by [`Conversation::begin`].
#[derive(Debug)]
#[must_use = "a pending request must be settled to leave the Sending state"]
pub struct PendingRequest {
    text: String,
    prior: Vec<ConversationTurn>,
}

impl PendingRequest {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// History as it was before this request's user turn.
    pub fn prior(&self) -> &[ConversationTurn] {
        &self.prior
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    history: Vec<ConversationTurn>,
    current: Option<WeatherSnapshot>,
    status: Status,
    error: Option<String>,
    unit: TemperatureUnit,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation opened by the ATMOS welcome turn.
    pub fn with_greeting() -> Self {
        let mut conversation = Self::new();
        conversation.history.push(ConversationTurn::assistant(prompt::WELCOME));
        conversation
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.history.last()
    }

    pub fn current_snapshot(&self) -> Option<&WeatherSnapshot> {
        self.current.as_ref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status != Status::Idle
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: TemperatureUnit) {
        self.unit = unit;
    }

    pub fn toggle_unit(&mut self) -> TemperatureUnit {
        self.unit = self.unit.toggle();
        self.unit
    }

    /// Idle -> Sending. Appends the user turn and clears any previous error.
    pub fn begin(&mut self, text: &str) -> Result<PendingRequest, SubmitError> {
        if self.status != Status::Idle {
            return Err(SubmitError::Busy);
        }
        self.start_sending(text)
    }

    /// Sending -> Idle, recording the gateway result. Refused unless a request
    /// is outstanding.
    pub fn settle(
        &mut self,
        pending: PendingRequest,
        result: Result<GatewayReply, GatewayError>,
    ) -> Result<Outcome, SubmitError> {
        if self.status != Status::Sending {
            return Err(SubmitError::NotPending);
        }
        self.status = Status::Idle;

        let outcome = match result {
            Ok(reply) => {
                let turn = ConversationTurn::from_reply(reply);
                if let Some(snapshot) = turn.snapshot() {
                    self.current = Some(snapshot.clone());
                }
                self.history.push(turn);
                self.error = None;
                Outcome::Settled
            }
            Err(err) => {
                tracing::debug!(error = %err, history = pending.prior.len(), "Gateway call failed");
                self.error = Some(CONNECTION_ERROR.to_string());
                Outcome::Failed
            }
        };
        Ok(outcome)
    }

    /// Idle -> Locating while the device position is resolved.
    pub fn begin_location(&mut self) -> Result<(), SubmitError> {
        if self.status != Status::Idle {
            return Err(SubmitError::Busy);
        }
        self.status = Status::Locating;
        self.error = None;
        Ok(())
    }

    /// Locating -> Sending with the GPS prompt.
    pub fn finish_location(&mut self, coords: Coordinates) -> Result<PendingRequest, SubmitError> {
        if self.status != Status::Locating {
            return Err(SubmitError::Busy);
        }
        self.start_sending(&prompt::gps_prompt(coords))
    }

    /// Locating -> Idle with a location-specific error. Nothing is sent.
    pub fn fail_location(&mut self, err: &LocationError) -> Result<Outcome, SubmitError> {
        if self.status != Status::Locating {
            return Err(SubmitError::Busy);
        }
        tracing::debug!(error = %err, "Could not resolve device location");
        self.status = Status::Idle;
        self.error = Some(
            match err {
                LocationError::Unsupported => LOCATION_UNSUPPORTED,
                LocationError::PermissionDenied | LocationError::Unavailable(_) => LOCATION_DENIED,
            }
            .to_string(),
        );
        Ok(Outcome::Failed)
    }

    fn start_sending(&mut self, text: &str) -> Result<PendingRequest, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let pending = PendingRequest { text: text.to_string(), prior: self.history.clone() };
        self.history.push(ConversationTurn::user(text));
        self.error = None;
        self.status = Status::Sending;
        Ok(pending)
    }
}

/// A conversation bound to a gateway, safe to drive from several tasks.
///
/// The lock is only taken to move between states, never across an await, so
/// other callers can observe `Sending` and get [`SubmitError::Busy`].
#[derive(Debug, Clone)]
pub struct ChatSession {
    state: Arc<Mutex<Conversation>>,
    gateway: Arc<dyn ModelGateway>,
}

impl ChatSession {
    pub fn new(gateway: Arc<dyn ModelGateway>, conversation: Conversation) -> Self {
        Self { state: Arc::new(Mutex::new(conversation)), gateway }
    }

    /// Read the conversation without holding the lock beyond `f`.
    pub fn with_state<R>(&self, f: impl FnOnce(&Conversation) -> R) -> R {
        f(&self.state.lock())
    }

    /// Copy of the current conversation.
    pub fn state(&self) -> Conversation {
        self.state.lock().clone()
    }

    pub fn toggle_unit(&self) -> TemperatureUnit {
        self.state.lock().toggle_unit()
    }

    pub fn set_unit(&self, unit: TemperatureUnit) {
        self.state.lock().set_unit(unit);
    }

    pub async fn submit(&self, text: &str) -> Result<Outcome, SubmitError> {
        let pending = self.state.lock().begin(text)?;
        self.dispatch(pending).await
    }

    pub async fn check_event(&self, event: &CampusEvent) -> Result<Outcome, SubmitError> {
        self.submit(&event.forecast_prompt()).await
    }

    /// Resolve the device position, then ask for the weather there.
    pub async fn detect_location(
        &self,
        source: &dyn LocationSource,
    ) -> Result<Outcome, SubmitError> {
        self.state.lock().begin_location()?;

        let position = source.current_position().await;

        let pending = {
            let mut state = self.state.lock();
            match position {
                Ok(coords) => state.finish_location(coords)?,
                Err(err) => return state.fail_location(&err),
            }
        };

        self.dispatch(pending).await
    }

    async fn dispatch(&self, pending: PendingRequest) -> Result<Outcome, SubmitError> {
        let result = self.gateway.send_message(pending.text(), pending.prior()).await;
        self.state.lock().settle(pending, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn reply(text: &str, location: Option<&str>) -> GatewayReply {
        GatewayReply {
            display_text: text.to_string(),
            snapshot: location.map(|loc| {
                serde_json::from_value(serde_json::json!({ "location": loc })).unwrap()
            }),
            sources: vec!["https://example.com/forecast".to_string()],
        }
    }

    #[test]
    fn settled_request_appends_user_then_assistant() {
        let mut conv = Conversation::new();

        let pending = conv.begin("Weather in Chennai today?").unwrap();
        assert_eq!(conv.status(), Status::Sending);
        assert!(pending.prior().is_empty());

        let outcome = conv.settle(pending, Ok(reply("Sunny.", Some("Chennai")))).unwrap();

        assert_eq!(outcome, Outcome::Settled);
        assert!(!conv.is_loading());
        let roles: Vec<_> = conv.history().iter().map(|t| t.role()).collect();
        assert_eq!(roles, vec![crate::Role::User, crate::Role::Assistant]);
        assert_eq!(conv.last_turn().unwrap().sources().len(), 1);
        assert_eq!(conv.current_snapshot().map(|s| s.location.as_str()), Some("Chennai"));
    }

    #[test]
    fn second_begin_while_sending_changes_nothing() {
        let mut conv = Conversation::with_greeting();
        let _pending = conv.begin("first").unwrap();
        let len = conv.history().len();

        assert_eq!(conv.begin("second").unwrap_err(), SubmitError::Busy);
        assert_eq!(conv.history().len(), len);
        assert!(conv.is_loading());
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut conv = Conversation::new();
        assert_eq!(conv.begin("   \n").unwrap_err(), SubmitError::EmptyInput);
        assert!(conv.history().is_empty());
        assert_eq!(conv.status(), Status::Idle);
    }

    #[test]
    fn failure_keeps_user_turn_and_sets_error() {
        let mut conv = Conversation::with_greeting();
        let pending = conv.begin("Rain tonight?").unwrap();

        let outcome = conv.settle(pending, Err(GatewayError::Other("boom".into()))).unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(conv.history().len(), 2);
        assert_eq!(conv.last_turn().unwrap().text(), "Rain tonight?");
        assert_eq!(conv.error(), Some(CONNECTION_ERROR));
        assert!(!conv.is_loading());
    }

    #[test]
    fn snapshot_is_replaced_not_merged_and_kept_when_absent() {
        let mut conv = Conversation::new();

        let p = conv.begin("a").unwrap();
        conv.settle(p, Ok(reply("one", Some("Chennai")))).unwrap();
        let p = conv.begin("b").unwrap();
        conv.settle(p, Ok(reply("two", None))).unwrap();
        assert_eq!(conv.current_snapshot().unwrap().location, "Chennai");

        let p = conv.begin("c").unwrap();
        conv.settle(p, Ok(reply("three", Some("Madurai")))).unwrap();
        assert_eq!(conv.current_snapshot().unwrap().location, "Madurai");
    }

    #[test]
    fn prior_history_excludes_the_new_turn() {
        let mut conv = Conversation::with_greeting();
        let pending = conv.begin("hello").unwrap();

        assert_eq!(pending.prior().len(), 1);
        assert_eq!(pending.prior()[0].text(), prompt::WELCOME);
        assert_eq!(pending.text(), "hello");
    }

    #[test]
    fn location_failure_never_sends() {
        let mut conv = Conversation::new();
        conv.begin_location().unwrap();
        assert_eq!(conv.status(), Status::Locating);
        assert_eq!(conv.begin("hi").unwrap_err(), SubmitError::Busy);

        assert_eq!(conv.fail_location(&LocationError::PermissionDenied), Ok(Outcome::Failed));
        assert_eq!(conv.error(), Some(LOCATION_DENIED));
        assert!(conv.history().is_empty());
        assert!(!conv.is_loading());

        conv.begin_location().unwrap();
        conv.fail_location(&LocationError::Unsupported).unwrap();
        assert_eq!(conv.error(), Some(LOCATION_UNSUPPORTED));
    }

    #[test]
    fn location_failure_cannot_reopen_a_sending_conversation() {
        let mut conv = Conversation::new();
        let _first = conv.begin("first").unwrap();

        assert_eq!(conv.fail_location(&LocationError::Unsupported), Err(SubmitError::Busy));
        assert_eq!(conv.status(), Status::Sending);
        assert!(conv.error().is_none());
        assert_eq!(conv.begin("second").unwrap_err(), SubmitError::Busy);
        assert_eq!(conv.history().len(), 1);
    }

    #[test]
    fn settle_without_outstanding_request_is_refused() {
        let mut conv = Conversation::new();
        let pending = conv.begin("first").unwrap();
        conv.settle(pending, Ok(reply("one", None))).unwrap();

        let mut other = Conversation::new();
        let stray = other.begin("elsewhere").unwrap();
        assert_eq!(
            conv.settle(stray, Ok(reply("two", None))),
            Err(SubmitError::NotPending)
        );
        assert_eq!(conv.history().len(), 2);
    }

    #[test]
    fn failed_call_is_not_logged_above_debug() {
        let buf = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(buf.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut conv = Conversation::new();
            let pending = conv.begin("Weather near my hostel?").unwrap();
            conv.settle(pending, Err(GatewayError::Other("upstream detail".into()))).unwrap();

            conv.begin_location().unwrap();
            conv.fail_location(&LocationError::PermissionDenied).unwrap();
        });

        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn location_success_sends_gps_prompt() {
        let mut conv = Conversation::new();
        conv.begin_location().unwrap();

        let pending = conv.finish_location(Coordinates { latitude: 13.0, longitude: 80.2 }).unwrap();
        assert!(pending.text().contains("13, 80.2"));
        assert_eq!(conv.status(), Status::Sending);
    }

    #[test]
    fn finish_location_requires_locating() {
        let mut conv = Conversation::new();
        let coords = Coordinates { latitude: 1.0, longitude: 2.0 };
        assert_eq!(conv.finish_location(coords).unwrap_err(), SubmitError::Busy);
    }

    #[test]
    fn unit_toggle_does_not_touch_snapshot() {
        let mut conv = Conversation::new();
        let p = conv.begin("a").unwrap();
        conv.settle(p, Ok(reply("one", Some("Chennai")))).unwrap();
        let before = conv.current_snapshot().cloned();

        assert_eq!(conv.toggle_unit(), TemperatureUnit::Fahrenheit);
        assert_eq!(conv.current_snapshot().cloned(), before);
    }
}
