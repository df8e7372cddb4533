//! Final answer generation

use copilot_sdk::core::{ChatMessage, ResponseFormat};
use log::info;

use crate::error::Result;
use crate::model::ModelSession;
use crate::prompts::{self, TROUBLESHOOTING, TROUBLESHOOTING_PERSONA};
use crate::sink::OutputSink;
use crate::types::ErrorContext;

/// Messages for the answer call. Summaries are embedded as a JSON array
/// of strings.
pub fn build_answer_messages(
    error_context: &ErrorContext,
    summaries: &[String],
    output_log: &str,
    query: &str,
) -> Vec<ChatMessage> {
    let context_json = error_context.to_json();
    let summaries_json = serde_json::to_string(summaries).unwrap_or_else(|_| "[]".to_string());
    let prompt = prompts::render(
        TROUBLESHOOTING,
        &[
            ("errorContext", context_json.as_str()),
            ("searchResults", summaries_json.as_str()),
            ("outputLog", output_log),
            ("rephrasedQuery", query),
        ],
    );

    vec![ChatMessage::system(TROUBLESHOOTING_PERSONA), ChatMessage::user(prompt)]
}

/// Generate the answer and forward it to `sink`.
///
/// Streaming forwards each fragment as it arrives; otherwise the whole
/// answer is forwarded once. Either way the full answer is returned.
pub async fn synthesize(
    session: &ModelSession,
    messages: &[ChatMessage],
    sink: &dyn OutputSink,
    streaming: bool,
) -> Result<String> {
    let answer = if streaming {
        session.stream_to(messages, sink).await?
    } else {
        let answer = session.complete(messages, ResponseFormat::Text).await?;
        sink.markdown(&answer);
        answer
    };

    info!("Answer generated ({} chars, streamed: {})", answer.len(), streaming);
    Ok(answer)
}
