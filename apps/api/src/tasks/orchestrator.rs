//! Orchestrator: runs one task end to end.
//!
//! Flow: Idle → Building (prompt builder) → Invoking(attempt i) … (failover
//! controller) → Succeeded | Failed → response normalizer.
//!
//! Calls are independent: nothing here is cached or keyed by input, and two
//! calls in flight share only the credential pool.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::llm_client::{CallFailure, CallState, FailoverController};
use crate::tasks::builder::build_payload;
use crate::tasks::normalizer::{normalize, parse_quiz, ParseFailure, QuizItem, TaskOutput};
use crate::tasks::task::TaskRequest;

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The model could not be reached with any credential.
    #[error("{0}")]
    Transient(CallFailure),

    /// The model answered, but not in the required shape.
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

impl From<CallFailure> for TaskError {
    fn from(failure: CallFailure) -> Self {
        TaskError::Transient(failure)
    }
}

/// Everything that happened during one `run_traced` call.
#[derive(Debug)]
pub struct TaskRun {
    pub result: Result<TaskOutput, TaskError>,
    pub attempts: usize,
    pub trace: Vec<CallState>,
}

/// Notes plus quiz generated from one document. A quiz failure does not
/// discard the notes: it leaves `questions` empty and sets `quiz_error`.
#[derive(Debug, Clone, Serialize)]
pub struct StudyPack {
    pub smart_notes: String,
    #[serde(rename = "mcq_json")]
    pub questions: Vec<QuizItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_error: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    controller: FailoverController,
}

impl Orchestrator {
    pub fn new(controller: FailoverController) -> Self {
        Self { controller }
    }

    pub async fn run(&self, request: &TaskRequest) -> Result<TaskOutput, TaskError> {
        self.run_traced(request).await.result
    }

    pub async fn run_traced(&self, request: &TaskRequest) -> TaskRun {
        let kind = request.kind();
        let span = info_span!("task", kind = kind.as_str(), call_id = %Uuid::new_v4());

        async move {
            let mut trace = vec![CallState::Idle, CallState::Building];
            debug!("Building payload");
            let payload = build_payload(request);

            let execution = self
                .controller
                .execute_traced(&payload, kind.timeout())
                .await;
            trace.extend(execution.trace);

            let result = match execution.outcome {
                Ok(raw) => normalize(kind, raw).map_err(|e| {
                    warn!("Model answer rejected: {}", e.reason);
                    TaskError::from(e)
                }),
                Err(failure) => Err(TaskError::from(failure)),
            };

            TaskRun {
                result,
                attempts: execution.attempts,
                trace,
            }
        }
        .instrument(span)
        .await
    }

    /// Executes the request and returns the raw model text, skipping normalization.
    async fn raw(&self, request: &TaskRequest) -> Result<String, TaskError> {
        let kind = request.kind();
        let span = info_span!("task", kind = kind.as_str(), call_id = %Uuid::new_v4());
        let payload = build_payload(request);
        self.controller
            .execute(&payload, kind.timeout())
            .instrument(span)
            .await
            .map_err(TaskError::from)
    }

    /// Notes first, then the quiz, strictly in that order.
    pub async fn study_pack(&self, text: &str, page_count: u32) -> Result<StudyPack, TaskError> {
        let smart_notes = self
            .raw(&TaskRequest::SmartNotes {
                text: text.to_string(),
                page_count,
            })
            .await?;

        let quiz = self
            .raw(&TaskRequest::McqSet {
                text: text.to_string(),
            })
            .await
            .and_then(|raw| parse_quiz(&raw).map_err(TaskError::from));

        let (questions, quiz_error) = match quiz {
            Ok(questions) => (questions, None),
            Err(e) => {
                warn!("Quiz generation failed, returning notes only: {e}");
                (Vec::new(), Some(e.to_string()))
            }
        };

        info!(
            "Study pack ready: notes_chars={}, questions={}",
            smart_notes.len(),
            questions.len()
        );

        Ok(StudyPack {
            smart_notes,
            questions,
            quiz_error,
        })
    }
}
