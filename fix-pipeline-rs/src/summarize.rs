//! Per-candidate summarization

use copilot_sdk::core::{ChatMessage, ResponseFormat};
use copilot_sdk::resilience::Bulkhead;
use log::info;

use crate::error::{FixError, Result};
use crate::model::ModelSession;
use crate::prompts::{self, SUMMARIZE_ISSUE, SUMMARIZE_QA};
use crate::types::SearchResult;

/// One summary per candidate: every issue first, then every Q&A post,
/// each group in its original order.
pub async fn summarize(
    session: &ModelSession,
    retained: &[SearchResult],
    question: &str,
    bulkhead: &Bulkhead,
) -> Result<Vec<String>> {
    let ordered: Vec<&SearchResult> = retained
        .iter()
        .filter(|r| r.is_issue())
        .chain(retained.iter().filter(|r| !r.is_issue()))
        .collect();
    if ordered.is_empty() {
        return Ok(Vec::new());
    }

    let question = prompts::question_or_default(question);
    let summaries = bulkhead
        .run_all(ordered, |result| async move {
            let template = if result.is_issue() { SUMMARIZE_ISSUE } else { SUMMARIZE_QA };
            let result_json = result.to_json();
            let prompt = prompts::render(
                template,
                &[("searchResult", result_json.as_str()), ("question", question)],
            );
            let reply = session
                .complete(&[ChatMessage::user(prompt)], ResponseFormat::Text)
                .await?;
            Ok::<String, FixError>(reply.trim().to_string())
        })
        .await
        .into_iter()
        .collect::<Result<Vec<String>>>()?;

    info!("Summarized {} search result(s)", summaries.len());
    Ok(summaries)
}
