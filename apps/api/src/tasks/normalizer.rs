//! Response Normalizer: task-specific post-processing of raw model text.
//!
//! Free-text and HTML answers pass through untouched. Quiz answers must be a
//! JSON array of well-formed `QuizItem`s; anything else is a `ParseFailure`,
//! distinct from a failure to reach the model at all.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tasks::task::TaskKind;

/// How much of the raw answer a `ParseFailure` keeps for logging.
const RAW_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];
}

impl FromStr for OptionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionKey::A),
            "B" => Ok(OptionKey::B),
            "C" => Ok(OptionKey::C),
            "D" => Ok(OptionKey::D),
            other => Err(format!("'{other}' is not an option label (expected A-D)")),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
        };
        f.write_str(label)
    }
}

/// One validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizItem {
    pub question: String,
    pub options: BTreeMap<OptionKey, String>,
    pub correct: OptionKey,
    pub explanation: String,
}

/// Item shape as the model emits it, before validation.
#[derive(Debug, Deserialize)]
struct RawQuizItem {
    question: String,
    options: BTreeMap<String, String>,
    #[serde(alias = "correctKey", alias = "correct_key", alias = "answer")]
    correct: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse MCQ JSON: {reason}")]
pub struct ParseFailure {
    pub reason: String,
    /// Leading slice of the model's answer.
    pub raw_excerpt: String,
}

impl ParseFailure {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw_excerpt: raw.chars().take(RAW_EXCERPT_CHARS).collect(),
        }
    }
}

/// Normalized answer. Serializes as a single-key object named after the
/// field the front end reads, e.g. `{"smart_notes": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TaskOutput {
    #[serde(rename = "smart_notes")]
    Notes(String),
    #[serde(rename = "questions")]
    Quiz(Vec<QuizItem>),
    #[serde(rename = "report_html")]
    CareerReport(String),
    #[serde(rename = "reply")]
    ChatReply(String),
}

pub fn normalize(kind: TaskKind, raw: String) -> Result<TaskOutput, ParseFailure> {
    match kind {
        TaskKind::SmartNotes => Ok(TaskOutput::Notes(raw)),
        TaskKind::McqSet => parse_quiz(&raw).map(TaskOutput::Quiz),
        TaskKind::CareerReport => Ok(TaskOutput::CareerReport(raw)),
        TaskKind::ChatTurn => Ok(TaskOutput::ChatReply(raw)),
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

pub fn parse_quiz(raw: &str) -> Result<Vec<QuizItem>, ParseFailure> {
    let json = strip_json_fences(raw);
    let items: Vec<RawQuizItem> =
        serde_json::from_str(json).map_err(|e| ParseFailure::new(e.to_string(), raw))?;

    if items.is_empty() {
        return Err(ParseFailure::new("model returned an empty question list", raw));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            validate_item(item)
                .map_err(|e| ParseFailure::new(format!("item {}: {e}", i + 1), raw))
        })
        .collect()
}

fn validate_item(item: RawQuizItem) -> Result<QuizItem, String> {
    let question = item.question.trim().to_string();
    if question.is_empty() {
        return Err("question is empty".to_string());
    }

    let mut options = BTreeMap::new();
    for (key, text) in item.options {
        let key: OptionKey = key.parse()?;
        if options.insert(key, text.trim().to_string()).is_some() {
            return Err(format!("option {key} appears twice"));
        }
    }
    if options.len() != OptionKey::ALL.len() {
        return Err(format!("expected options A-D, got {} option(s)", options.len()));
    }

    let correct: OptionKey = item.correct.parse()?;

    Ok(QuizItem {
        question,
        options,
        correct,
        explanation: item.explanation.trim().to_string(),
    })
}
