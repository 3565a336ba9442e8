//! Core library for the `atmos` weather chat.
//!
//! This crate defines:
//! - The model gateway (Gemini with Search grounding) and its configuration
//! - Extraction of the structured weather record embedded in model replies
//! - Temperature unit conversion
//! - Conversation state: history, current snapshot, request lifecycle
//!
//! It is used by `atmos-cli`, but can also be reused by other front-ends.

pub mod config;
pub mod conversation;
pub mod events;
pub mod gateway;
pub mod location;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod units;

pub use config::Config;
pub use conversation::{ChatSession, Conversation, Outcome, PendingRequest, Status, SubmitError};
pub use events::{CampusEvent, EventKind};
pub use gateway::{GatewayConfig, GatewayError, ModelGateway, gemini::GeminiGateway};
pub use location::{Coordinates, FixedLocation, LocationError, LocationSource, NoLocation};
pub use model::{ChartPoint, ConversationTurn, GatewayReply, Role, TemperatureUnit, WeatherSnapshot};
pub use units::format_temperature;
