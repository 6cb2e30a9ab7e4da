//! LLM integration module.
//!
//! Provides an OpenAI-compatible client for chat completions and
//! the prompts used for answering, judging and ground-truth generation.

mod client;
mod json;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role};
pub(crate) use client::ApiError;
pub use json::extract_json;
pub use prompts::Prompts;
