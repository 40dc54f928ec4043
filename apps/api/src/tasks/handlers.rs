use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::documents::{extract_pdf_text, truncate_chars, DocumentError, ExtractedDocument};
use crate::errors::AppError;
use crate::llm_client::InlineAttachment;
use crate::state::AppState;
use crate::tasks::conversation::TranscriptTurn;
use crate::tasks::normalizer::TaskOutput;
use crate::tasks::{StudyPack, TaskRequest};

/// Resume text beyond this many characters is not sent to the model.
pub const MAX_RESUME_CHARS: usize = 15_000;

#[derive(Deserialize)]
pub struct NotesRequest {
    pub text: String,
    #[serde(default = "default_page_count")]
    pub page_count: u32,
}

fn default_page_count() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct QuizRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct AttachmentUpload {
    pub mime_type: String,
    /// Base64, standard alphabet.
    pub data: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<TranscriptTurn>,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentUpload>,
}

#[derive(Serialize)]
pub struct StudyDocumentResponse {
    pub title: String,
    #[serde(flatten)]
    pub pack: StudyPack,
    pub pages: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CareerReportResponse {
    pub role: String,
    pub report_html: String,
}

/// POST /api/v1/notes
pub async fn handle_notes(
    State(state): State<AppState>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<TaskOutput>, AppError> {
    require_text(&req.text, "text")?;
    let output = state
        .orchestrator
        .run(&TaskRequest::SmartNotes {
            text: req.text,
            page_count: req.page_count,
        })
        .await?;
    Ok(Json(output))
}

/// POST /api/v1/quiz
pub async fn handle_quiz(
    State(state): State<AppState>,
    Json(req): Json<QuizRequest>,
) -> Result<Json<TaskOutput>, AppError> {
    require_text(&req.text, "text")?;
    let output = state
        .orchestrator
        .run(&TaskRequest::McqSet { text: req.text })
        .await?;
    Ok(Json(output))
}

/// POST /api/v1/documents/study
/// Multipart form with a single PDF `file` field.
pub async fn handle_study_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StudyDocumentResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("document.pdf").to_string();
            upload = Some((file_name, field.bytes().await?.to_vec()));
        }
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let document = extract(bytes).await?;
    let pack = state
        .orchestrator
        .study_pack(&document.text, document.page_count)
        .await?;

    let title = document_title(&file_name);
    info!("Study pack generated for '{title}' ({} pages)", document.page_count);

    Ok(Json(StudyDocumentResponse {
        title,
        pack,
        pages: document.page_count,
        generated_at: Utc::now(),
    }))
}

/// POST /api/v1/career/report
/// Multipart form with a PDF `file` (resume) and a `role` text field.
pub async fn handle_career_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CareerReportResponse>, AppError> {
    let mut resume: Option<Vec<u8>> = None;
    let mut role = String::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => resume = Some(field.bytes().await?.to_vec()),
            Some("role") => role = field.text().await?.trim().to_string(),
            _ => {}
        }
    }
    require_text(&role, "role")?;
    let bytes = resume
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("Missing resume 'file' field".to_string()))?;

    let document = extract(bytes).await?;
    let resume_text = truncate_chars(&document.text, MAX_RESUME_CHARS).to_string();

    let output = state
        .orchestrator
        .run(&TaskRequest::CareerReport {
            resume_text,
            role: role.clone(),
        })
        .await?;
    let TaskOutput::CareerReport(report_html) = output else {
        return Err(AppError::Internal(anyhow::anyhow!(
            "career report task produced a non-report output"
        )));
    };

    Ok(Json(CareerReportResponse { role, report_html }))
}

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<TaskOutput>, AppError> {
    if req.input.trim().is_empty() && req.attachments.is_empty() {
        return Err(AppError::Validation(
            "Message must have text or at least one attachment".to_string(),
        ));
    }

    let attachments = req
        .attachments
        .into_iter()
        .map(decode_attachment)
        .collect::<Result<Vec<_>, _>>()?;

    let output = state
        .orchestrator
        .run(&TaskRequest::ChatTurn {
            history: req.history,
            user_input: req.input,
            attachments,
        })
        .await?;
    Ok(Json(output))
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{field}' must not be empty")));
    }
    Ok(())
}

fn decode_attachment(upload: AttachmentUpload) -> Result<InlineAttachment, AppError> {
    let data = STANDARD.decode(upload.data.trim()).map_err(|e| {
        AppError::Validation(format!("Attachment is not valid base64: {e}"))
    })?;
    Ok(InlineAttachment::new(upload.mime_type, data))
}

/// PDF parsing is CPU-bound; keep it off the async workers.
async fn extract(bytes: Vec<u8>) -> Result<ExtractedDocument, AppError> {
    let document = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(extraction_aborted)??;
    Ok(document)
}

/// A panic inside the PDF parser means the upload could not be read.
fn extraction_aborted(err: JoinError) -> AppError {
    if err.is_panic() {
        warn!("PDF parser panicked: {err}");
        AppError::Document(DocumentError::Unreadable(
            "PDF parser failed on this file".to_string(),
        ))
    } else {
        AppError::Internal(err.into())
    }
}

fn document_title(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(".pdf")
        .or_else(|| file_name.strip_suffix(".PDF"))
        .unwrap_or(file_name);
    if stem.trim().is_empty() {
        "Untitled document".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use axum::response::IntoResponse;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::{
        Credential, CredentialPool, FailoverController, LlmError, ModelBackend, RequestPayload,
    };
    use crate::routes::build_router;
    use crate::tasks::Orchestrator;

    /// Answers every request with the same canned result.
    struct Canned {
        answer: Option<String>,
        payloads: Mutex<Vec<RequestPayload>>,
    }

    #[async_trait]
    impl ModelBackend for Canned {
        async fn generate(
            &self,
            _credential: &Credential,
            payload: &RequestPayload,
        ) -> Result<String, LlmError> {
            self.payloads.lock().unwrap().push(payload.clone());
            self.answer.clone().ok_or(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            })
        }
    }

    fn app(answer: Option<&str>) -> (Router, Arc<Canned>) {
        let backend = Arc::new(Canned {
            answer: answer.map(String::from),
            payloads: Mutex::new(Vec::new()),
        });
        let pool = Arc::new(CredentialPool::new(vec!["k0", "k1"]).unwrap());
        let orchestrator = Orchestrator::new(FailoverController::new(backend.clone(), pool));
        (build_router(AppState::new(orchestrator)), backend)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, fields: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let boundary = "edupro-test-boundary";
        let mut body = Vec::new();
        for (name, file_name, data) in fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match file_name {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_notes_returns_model_markdown() {
        let (app, backend) = app(Some("## Photosynthesis"));
        let (status, body) = send(
            app,
            json_request("/api/v1/notes", json!({"text": "light to sugar", "page_count": 2})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"smart_notes": "## Photosynthesis"}));
        assert!(backend.payloads.lock().unwrap()[0]
            .message_text()
            .contains("approx 2 pages"));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_calling_model() {
        let (app, backend) = app(Some("unused"));
        let (status, body) = send(app, json_request("/api/v1/quiz", json!({"text": "  "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(backend.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_quiz_maps_to_parse_failure() {
        let (app, _) = app(Some("Here you go!"));
        let (status, body) = send(app, json_request("/api/v1/quiz", json!({"text": "cells"}))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PARSE_FAILURE");
    }

    #[tokio::test]
    async fn test_exhausted_pool_maps_to_bad_gateway() {
        let (app, backend) = app(None);
        let (status, body) = send(app, json_request("/api/v1/chat", json!({"input": "hi"}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        // one attempt per credential
        assert_eq!(backend.payloads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_decodes_attachments() {
        let (app, backend) = app(Some("That is a rectangle."));
        let (status, body) = send(
            app,
            json_request(
                "/api/v1/chat",
                json!({
                    "history": [{"role": "assistant", "content": "Hello!"}],
                    "input": "",
                    "attachments": [{"mime_type": "image/png", "data": "iVBORw=="}]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"reply": "That is a rectangle."}));
        let sent = &backend.payloads.lock().unwrap()[0];
        assert_eq!(sent.attachment_count(), 1);
        assert!(sent.history.is_empty());
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_base64() {
        let (app, _) = app(Some("unused"));
        let (status, _) = send(
            app,
            json_request(
                "/api/v1/chat",
                json!({"input": "look", "attachments": [{"mime_type": "image/png", "data": "%%%"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_without_text_or_files_is_rejected() {
        let (app, _) = app(Some("unused"));
        let (status, _) = send(app, json_request("/api/v1/chat", json!({"input": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_study_upload_of_non_pdf_is_a_document_error() {
        let (app, backend) = app(Some("unused"));
        let (status, body) = send(
            app,
            multipart_request(
                "/api/v1/documents/study",
                &[("file", Some("notes.pdf"), b"not a pdf at all".as_slice())],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DOCUMENT_ERROR");
        assert!(backend.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_study_upload_without_file_is_rejected() {
        let (app, _) = app(Some("unused"));
        let (status, _) = send(
            app,
            multipart_request("/api/v1/documents/study", &[("other", None, b"x".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_career_report_requires_role() {
        let (app, _) = app(Some("unused"));
        let (status, body) = send(
            app,
            multipart_request(
                "/api/v1/career/report",
                &[("file", Some("cv.pdf"), b"%PDF-1.5".as_slice()), ("role", None, b"  ".as_slice())],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("role"));
    }

    #[tokio::test]
    async fn test_parser_panic_is_a_document_error() {
        let err = tokio::task::spawn_blocking(|| panic!("malformed xref"))
            .await
            .unwrap_err();
        let response = extraction_aborted(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_document_title_strips_extension() {
        assert_eq!(document_title("Biology Ch3.pdf"), "Biology Ch3");
        assert_eq!(document_title("SCAN.PDF"), "SCAN");
        assert_eq!(document_title("notes"), "notes");
        assert_eq!(document_title(".pdf"), "Untitled document");
    }
}
