use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

use crate::{
    Config,
    gateway::gemini::GeminiGateway,
    model::{ConversationTurn, GatewayReply},
};

pub mod gemini;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Settings a gateway is built from. Never mutated after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Sent as-is; an empty key is left for the provider to reject.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Why a gateway call produced no reply. Callers show one generic message for
/// all of these; the variants exist for logs.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to reach the model provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode model provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model provider call failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait ModelGateway: Send + Sync + Debug {
    /// Send `user_text` after `prior` and return the parsed reply.
    async fn send_message(
        &self,
        user_text: &str,
        prior: &[ConversationTurn],
    ) -> Result<GatewayReply, GatewayError>;
}

/// Build the Gemini gateway from on-disk configuration plus environment overrides.
pub fn gateway_from_config(config: &Config) -> anyhow::Result<Arc<dyn ModelGateway>> {
    let gateway = GeminiGateway::new(config.gateway_config())?;
    Ok(Arc::new(gateway))
}
