//! Prompt Builder: maps a `TaskRequest` to the finalized `RequestPayload`.
//!
//! Pure and deterministic: identical requests yield identical payloads. The
//! builder never truncates its inputs; callers bound them upstream.

use crate::llm_client::prompts::{
    fill_template, with_safety_line, DIAGRAM_TAG_FORMAT, HTML_ONLY_INSTRUCTION,
    JSON_ONLY_INSTRUCTION,
};
use crate::llm_client::RequestPayload;
use crate::tasks::conversation::shape_conversation;
use crate::tasks::prompts::{
    CAREER_REPORT_PROMPT_TEMPLATE, CHAT_PERSONA_TEMPLATE, MCQ_PROMPT_TEMPLATE,
    SMART_NOTES_PROMPT_TEMPLATE,
};
use crate::tasks::task::TaskRequest;

pub fn build_payload(request: &TaskRequest) -> RequestPayload {
    match request {
        TaskRequest::SmartNotes { text, page_count } => {
            RequestPayload::prompt(smart_notes_prompt(text, *page_count))
        }
        TaskRequest::McqSet { text } => RequestPayload::prompt(mcq_prompt(text)),
        TaskRequest::CareerReport { resume_text, role } => {
            RequestPayload::prompt(career_report_prompt(resume_text, role))
        }
        TaskRequest::ChatTurn {
            history,
            user_input,
            attachments,
        } => {
            let shaped = shape_conversation(history, user_input, attachments);
            RequestPayload {
                system_instruction: Some(chat_persona()),
                history: shaped.history,
                message: shaped.message,
            }
        }
    }
}

fn smart_notes_prompt(text: &str, page_count: u32) -> String {
    let page_count = page_count.to_string();
    with_safety_line(fill_template(
        SMART_NOTES_PROMPT_TEMPLATE,
        &[
            ("page_count", page_count.as_str()),
            ("diagram_tag", DIAGRAM_TAG_FORMAT),
            ("text", text),
        ],
    ))
}

fn mcq_prompt(text: &str) -> String {
    with_safety_line(fill_template(
        MCQ_PROMPT_TEMPLATE,
        &[("json_only_instruction", JSON_ONLY_INSTRUCTION), ("text", text)],
    ))
}

fn career_report_prompt(resume_text: &str, role: &str) -> String {
    with_safety_line(fill_template(
        CAREER_REPORT_PROMPT_TEMPLATE,
        &[
            ("html_only_instruction", HTML_ONLY_INSTRUCTION),
            ("role", role),
            ("resume_text", resume_text),
        ],
    ))
}

fn chat_persona() -> String {
    fill_template(CHAT_PERSONA_TEMPLATE, &[("diagram_tag", DIAGRAM_TAG_FORMAT)])
}
