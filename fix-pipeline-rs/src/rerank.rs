//! Relevance scoring of retrieved candidates

use copilot_sdk::core::{ChatMessage, ResponseFormat};
use copilot_sdk::resilience::Bulkhead;
use log::{debug, info};

use crate::error::{FixError, Result};
use crate::model::ModelSession;
use crate::prompts::{self, RERANK};
use crate::types::{ErrorContext, ScoredResult, SearchResult};

/// Highest score the model may give
pub const MAX_SCORE: u8 = 2;

/// Score in a model reply: the first number in it when that is between 0
/// and [`MAX_SCORE`], otherwise 0.
pub fn parse_score(reply: &str) -> u8 {
    let number: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match number.parse::<u8>() {
        Ok(score) if score <= MAX_SCORE => score,
        _ => 0,
    }
}

/// Score every candidate and keep those scoring at least `threshold`, in
/// their original order.
pub async fn rerank(
    session: &ModelSession,
    candidates: &[SearchResult],
    error_context: &ErrorContext,
    question: &str,
    threshold: u8,
    bulkhead: &Bulkhead,
) -> Result<Vec<ScoredResult>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let context_json = error_context.to_json();
    let question = prompts::question_or_default(question);

    let scores = bulkhead
        .run_all(candidates.iter(), |candidate| {
            let context_json = context_json.as_str();
            async move {
                let candidate_json = candidate.to_json();
                let prompt = prompts::render(
                    RERANK,
                    &[
                        ("searchResult", candidate_json.as_str()),
                        ("errorContext", context_json),
                        ("question", question),
                    ],
                );
                let reply = session
                    .complete(&[ChatMessage::user(prompt)], ResponseFormat::Text)
                    .await?;
                let score = parse_score(&reply);
                debug!("Scored {} as {}", candidate.url(), score);
                Ok::<u8, FixError>(score)
            }
        })
        .await;

    let mut retained = Vec::new();
    for (candidate, score) in candidates.iter().zip(scores) {
        let score = score?;
        if score >= threshold {
            retained.push(ScoredResult {
                result: candidate.clone(),
                score,
            });
        }
    }

    info!(
        "Kept {} of {} candidate(s) at threshold {}",
        retained.len(),
        candidates.len(),
        threshold
    );
    Ok(retained)
}
