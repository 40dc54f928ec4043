/// LLM Client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Every generation goes through `FailoverController`, which drives
/// `engine::invoke` against a `ModelBackend` with the pool's active credential.
///
/// Model: gemini-2.5-flash (hardcoded, not configurable)
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod credentials;
pub mod engine;
pub mod failover;
pub mod payload;
pub mod prompts;

pub use credentials::{ConfigError, Credential, CredentialPool};
pub use engine::CallFailure;
pub use failover::{CallState, FailoverController};
pub use payload::{InlineAttachment, ModelRole, ModelTurn, Part, RequestPayload};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-2.5-flash";
/// Transport-level ceiling. Per-task deadlines are enforced by the engine and
/// are always shorter than this.
const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode model response: {0}")]
    Decode(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One call against the remote model. Implementations perform exactly one
/// request: retrying and credential rotation belong to the failover layer.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(
        &self,
        credential: &Credential,
        payload: &RequestPayload,
    ) -> Result<String, LlmError>;
}

// Gemini wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiResponse {
    /// Joins the text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

fn to_gemini_part(part: &Part) -> GeminiPart {
    match part {
        Part::Text(text) => GeminiPart::Text { text: text.clone() },
        Part::Inline(attachment) => GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: attachment.mime_type.clone(),
                data: BASE64.encode(&attachment.data),
            },
        },
    }
}

fn to_gemini_request(payload: &RequestPayload) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = payload
        .history
        .iter()
        .map(|turn| GeminiContent {
            role: turn.role.as_str(),
            parts: turn.parts.iter().map(to_gemini_part).collect(),
        })
        .collect();

    contents.push(GeminiContent {
        role: ModelRole::User.as_str(),
        parts: payload.message.iter().map(to_gemini_part).collect(),
    });

    GeminiRequest {
        contents,
        system_instruction: payload
            .system_instruction
            .as_ref()
            .map(|text| GeminiSystemInstruction {
                parts: vec![GeminiPart::Text { text: text.clone() }],
            }),
    }
}

/// The Gemini `generateContent` client. Holds no credential: the key is
/// supplied per call by the failover layer.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
}

impl LlmClient {
    pub fn new() -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, MODEL)
    }
}

#[async_trait]
impl ModelBackend for LlmClient {
    async fn generate(
        &self,
        credential: &Credential,
        payload: &RequestPayload,
    ) -> Result<String, LlmError> {
        let request_body = to_gemini_request(payload);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let gemini_response: GeminiResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
        let text = gemini_response.text().ok_or(LlmError::EmptyContent)?;

        debug!(
            "Gemini call succeeded: history_turns={}, attachments={}, response_chars={}",
            payload.history.len(),
            payload.attachment_count(),
            text.len()
        );

        Ok(text)
    }
}
