//! Finalized request payloads handed to the remote model.
//!
//! A payload is built once by the prompt builder and then only borrowed:
//! every failover attempt sends the exact same value.

use bytes::Bytes;

/// A binary blob sent inline with a single request. Base64-encoded only when
/// serialized for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAttachment {
    pub mime_type: String,
    pub data: Bytes,
}

impl InlineAttachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Inline(InlineAttachment),
}

/// Roles as the remote protocol names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    User,
    Model,
}

impl ModelRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelRole::User => "user",
            ModelRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTurn {
    pub role: ModelRole,
    pub parts: Vec<Part>,
}

impl ModelTurn {
    pub fn text(role: ModelRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    /// Persona directive sent outside the conversation history.
    pub system_instruction: Option<String>,
    /// Prior turns, always starting on the user side.
    pub history: Vec<ModelTurn>,
    /// The live user message.
    pub message: Vec<Part>,
}

impl RequestPayload {
    /// A single-shot text prompt with no history and no persona.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            history: Vec::new(),
            message: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text of the live message. Attachments are skipped.
    pub fn message_text(&self) -> String {
        self.message
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::Inline(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn attachment_count(&self) -> usize {
        self.message
            .iter()
            .filter(|part| matches!(part, Part::Inline(_)))
            .count()
    }
}
