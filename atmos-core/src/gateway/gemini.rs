use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    model::{ConversationTurn, GatewayReply},
    parser::split_reply,
    prompt::ATMOS_SYSTEM_INSTRUCTION,
};

use super::{GatewayConfig, GatewayError, ModelGateway};

const FALLBACK_TEXT: &str = "I'm sorry, I couldn't process that request.";

/// Gateway to Google's `generateContent` endpoint with Search grounding on.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    config: GatewayConfig,
    http: Client,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder().build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(user_text: &str, prior: &[ConversationTurn]) -> GenerateContentRequest {
        let mut contents: Vec<Content> = prior
            .iter()
            .map(|turn| Content::text(turn.role().as_wire(), turn.text()))
            .collect();
        contents.push(Content::text("user", user_text));

        GenerateContentRequest {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![Part { text: ATMOS_SYSTEM_INSTRUCTION.to_string() }],
            },
            tools: vec![Tool { google_search: GoogleSearch {} }],
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn send_message(
        &self,
        user_text: &str,
        prior: &[ConversationTurn],
    ) -> Result<GatewayReply, GatewayError> {
        let request = Self::build_request(user_text, prior);

        tracing::debug!(
            model = %self.config.model,
            history = prior.len(),
            "Sending message to Gemini"
        );

        let res = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "Gemini request failed to send"))?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Gemini returned an error status");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .inspect_err(|e| tracing::debug!(error = %e, "Failed to parse Gemini response JSON"))?;

        let raw_text = parsed.text().unwrap_or_else(|| FALLBACK_TEXT.to_string());
        let sources = parsed.source_uris();
        let reply = split_reply(&raw_text);

        tracing::debug!(
            sources = sources.len(),
            snapshot = reply.snapshot.is_some(),
            "Gemini reply received"
        );

        Ok(GatewayReply { display_text: reply.display_text, snapshot: reply.snapshot, sources })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &'static str, text: &str) -> Self {
        Self { role, parts: vec![Part { text: text.to_string() }] }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// All text parts of the first candidate, joined. `None` when empty.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }

    /// Distinct grounding URIs, first occurrence order.
    fn source_uris(&self) -> Vec<String> {
        let Some(metadata) = self.candidates.first().and_then(|c| c.grounding_metadata.as_ref())
        else {
            return Vec::new();
        };

        let mut uris: Vec<String> = Vec::new();
        for uri in metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref()?.uri.as_deref())
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
        {
            if !uris.iter().any(|seen| seen == uri) {
                uris.push(uri.to_string());
            }
        }
        uris
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
