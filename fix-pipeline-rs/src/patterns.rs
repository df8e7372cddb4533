//! Search-pattern extraction

use std::collections::HashSet;

use copilot_sdk::core::{ChatMessage, ResponseFormat};
use log::{info, warn};

use crate::error::Result;
use crate::lenient;
use crate::model::ModelSession;
use crate::prompts::{self, GET_SEARCH_PATTERNS};
use crate::types::{ErrorContext, SearchPlan};

/// Ask the model what to search for. Output that cannot be read as a plan
/// gives the empty plan, which skips retrieval.
pub async fn extract_search_plan(
    session: &ModelSession,
    error_context: &ErrorContext,
    output_log: &str,
    query: &str,
) -> Result<SearchPlan> {
    let context_json = error_context.to_json();
    let prompt = prompts::render(
        GET_SEARCH_PATTERNS,
        &[
            ("errorContext", context_json.as_str()),
            ("outputLog", output_log),
            ("userInput", query),
        ],
    );
    let reply = session
        .complete(&[ChatMessage::user(prompt)], ResponseFormat::JsonObject)
        .await?;

    let plan = match lenient::extract_json::<SearchPlan>(&reply) {
        Some(plan) => normalize(plan),
        None => {
            warn!("Could not read search patterns from model reply");
            SearchPlan::default()
        }
    };

    info!(
        "Search plan: code '{}', {} pattern(s)",
        plan.error_code,
        plan.search_patterns.len()
    );
    Ok(plan)
}

/// Trim patterns, drop blank ones and keep the first of any duplicates
pub fn normalize(plan: SearchPlan) -> SearchPlan {
    let mut seen = HashSet::new();
    let search_patterns = plan
        .search_patterns
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect();

    SearchPlan {
        error_code: plan.error_code.trim().to_string(),
        search_patterns,
    }
}
