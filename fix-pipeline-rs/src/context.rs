//! Error-context extraction

use copilot_sdk::core::{ChatMessage, ResponseFormat};
use log::{debug, info};
use serde_json::Value;

use crate::error::Result;
use crate::lenient;
use crate::model::ModelSession;
use crate::prompts::{self, PARSE_ERROR_CONTEXT};
use crate::types::{ChatHistory, ErrorContext};

/// Strictly parse `query` as an error-context object.
///
/// The query must be a JSON object whose `errorCode`, `message`, `stack`
/// and `helpLink` members are all present and all strings. Anything else
/// yields `None`.
pub fn parse_error_context(query: &str) -> Option<ErrorContext> {
    let value: Value = serde_json::from_str(query).ok()?;
    let object = value.as_object()?;
    let field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_string);

    Some(ErrorContext {
        error_code: field("errorCode")?,
        message: field("message")?,
        stack: field("stack")?,
        help_link: field("helpLink")?,
    })
}

/// Error context for this request: parsed directly from the query when it
/// is an error-context object, otherwise extracted by the model from the
/// conversation. Unusable model output gives the empty context.
pub async fn extract_error_context(
    session: &ModelSession,
    history: &ChatHistory,
    query: &str,
) -> Result<ErrorContext> {
    if let Some(context) = parse_error_context(query) {
        debug!("Query is an error context for {}", context.error_code);
        return Ok(context);
    }

    let history_json = history.to_json();
    let prompt = prompts::render(
        PARSE_ERROR_CONTEXT,
        &[("chat_history", history_json.as_str()), ("chat_input", query)],
    );
    let reply = session
        .complete(&[ChatMessage::user(prompt)], ResponseFormat::JsonObject)
        .await?;

    let context: ErrorContext = lenient::extract_json(&reply).unwrap_or_default();
    info!(
        "Extracted error context (code: '{}', has message: {})",
        context.error_code,
        !context.message.is_empty()
    );
    Ok(context)
}
