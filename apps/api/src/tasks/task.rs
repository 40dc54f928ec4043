//! Task requests: the closed set of things a user can ask the model to do.

use std::time::Duration;

use crate::llm_client::InlineAttachment;
use crate::tasks::conversation::TranscriptTurn;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Resume analysis produces a long structured report.
const CAREER_REPORT_TIMEOUT: Duration = Duration::from_secs(90);

/// One user request, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    SmartNotes {
        text: String,
        page_count: u32,
    },
    McqSet {
        text: String,
    },
    CareerReport {
        resume_text: String,
        role: String,
    },
    ChatTurn {
        history: Vec<TranscriptTurn>,
        user_input: String,
        attachments: Vec<InlineAttachment>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    SmartNotes,
    McqSet,
    CareerReport,
    ChatTurn,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::SmartNotes => "smart_notes",
            TaskKind::McqSet => "mcq_set",
            TaskKind::CareerReport => "career_report",
            TaskKind::ChatTurn => "chat_turn",
        }
    }

    /// Per-attempt deadline for this task.
    pub fn timeout(self) -> Duration {
        match self {
            TaskKind::CareerReport => CAREER_REPORT_TIMEOUT,
            TaskKind::SmartNotes | TaskKind::McqSet | TaskKind::ChatTurn => DEFAULT_TIMEOUT,
        }
    }
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::SmartNotes { .. } => TaskKind::SmartNotes,
            TaskRequest::McqSet { .. } => TaskKind::McqSet,
            TaskRequest::CareerReport { .. } => TaskKind::CareerReport,
            TaskRequest::ChatTurn { .. } => TaskKind::ChatTurn,
        }
    }
}
