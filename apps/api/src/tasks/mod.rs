// Study & career tasks: prompt building, conversation shaping, response
// normalization, and the orchestrator that ties them to the failover layer.
// All LLM calls go through llm_client; no direct Gemini calls here.

pub mod builder;
pub mod conversation;
pub mod handlers;
pub mod normalizer;
pub mod orchestrator;
pub mod prompts;
pub mod task;

pub use orchestrator::{Orchestrator, StudyPack, TaskError};
pub use task::TaskRequest;
