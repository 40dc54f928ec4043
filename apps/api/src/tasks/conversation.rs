//! Conversation State Shaper: converts the UI transcript into the history the
//! model accepts.
//!
//! Rules:
//! - system turns are dropped (the persona is sent separately as a system instruction)
//! - assistant → model, user → user
//! - consecutive turns with the same role are merged so roles alternate
//! - history never starts with a model turn and never ends with a user turn
//!   (a trailing user turn is folded into the live message)
//! - a turn carrying attachments skips history entirely and is sent single-shot

use serde::{Deserialize, Serialize};

use crate::llm_client::{InlineAttachment, ModelRole, ModelTurn, Part};

/// Live message used when the user sends files without typing anything.
pub const DEFAULT_ATTACHMENT_PROMPT: &str = "Analyze these files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Assistant,
    System,
}

/// One message of the chat transcript as the UI stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: TranscriptRole,
    pub content: String,
    /// Names of files shown with this message in the UI. Never re-sent.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl TranscriptTurn {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedConversation {
    pub history: Vec<ModelTurn>,
    pub message: Vec<Part>,
}

pub fn shape_conversation(
    transcript: &[TranscriptTurn],
    user_input: &str,
    attachments: &[InlineAttachment],
) -> ShapedConversation {
    if !attachments.is_empty() {
        // Single-shot: attachment-bearing turns are not threaded into history.
        let text = if user_input.trim().is_empty() {
            DEFAULT_ATTACHMENT_PROMPT
        } else {
            user_input
        };
        let mut message = vec![Part::Text(text.to_string())];
        message.extend(attachments.iter().cloned().map(Part::Inline));
        return ShapedConversation {
            history: Vec::new(),
            message,
        };
    }

    let mut history: Vec<(ModelRole, String)> = Vec::new();
    for turn in transcript {
        let role = match turn.role {
            TranscriptRole::System => continue,
            TranscriptRole::User => ModelRole::User,
            TranscriptRole::Assistant => ModelRole::Model,
        };
        let content = turn.content.trim();
        if content.is_empty() {
            continue;
        }
        if let Some((last_role, text)) = history.last_mut() {
            if *last_role == role {
                text.push_str("\n\n");
                text.push_str(content);
                continue;
            }
        }
        history.push((role, content.to_string()));
    }

    if matches!(history.first(), Some((ModelRole::Model, _))) {
        history.remove(0);
    }

    let mut live = user_input.to_string();
    if matches!(history.last(), Some((ModelRole::User, _))) {
        if let Some((_, pending)) = history.pop() {
            live = format!("{pending}\n\n{live}");
        }
    }

    ShapedConversation {
        history: history
            .into_iter()
            .map(|(role, text)| ModelTurn::text(role, text))
            .collect(),
        message: vec![Part::Text(live)],
    }
}
