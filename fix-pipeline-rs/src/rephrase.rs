//! Query rephrasing against the chat history

use copilot_sdk::core::{ChatMessage, ResponseFormat};
use log::debug;

use crate::error::Result;
use crate::model::ModelSession;
use crate::prompts::{self, REPHRASE_QUERY};
use crate::types::ChatHistory;

/// Rewrite `input` as a standalone question.
///
/// With no history the input is returned unchanged and the model is not
/// called. An empty reply also falls back to the input.
pub async fn rephrase_query(session: &ModelSession, history: &ChatHistory, input: &str) -> Result<String> {
    if history.is_empty() {
        return Ok(input.to_string());
    }

    let history_json = history.to_json();
    let prompt = prompts::render(
        REPHRASE_QUERY,
        &[("chat_history", history_json.as_str()), ("chat_input", input)],
    );
    let messages = [ChatMessage::user(prompt), ChatMessage::user(input)];
    let reply = session.complete(&messages, ResponseFormat::Text).await?;

    let rephrased = reply.trim();
    if rephrased.is_empty() {
        debug!("Rephrase returned nothing; keeping the original query");
        return Ok(input.to_string());
    }

    debug!("Rephrased query: {}", rephrased);
    Ok(rephrased.to_string())
}
