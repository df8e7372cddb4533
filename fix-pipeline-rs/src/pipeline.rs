//! Request orchestration
//!
//! [`Troubleshooter`] runs the stages strictly in order:
//!
//! 1. error-context extraction
//! 2. output-log tail
//! 3. query rephrasing
//! 4. search-pattern extraction
//! 5. retrieval across every configured source
//! 6. reranking
//! 7. summarization
//! 8. answer synthesis
//!
//! Cancellation is checked before each stage and raced against every
//! model call and the retrieval fan-out.

use std::sync::Arc;

use copilot_sdk::core::ChatModel;
use copilot_sdk::resilience::Bulkhead;
use copilot_sdk::util::generate_request_id;
use futures::future::join_all;
use log::{error, info};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::context::extract_error_context;
use crate::error::{FixError, Result};
use crate::log_source::LogSource;
use crate::model::ModelSession;
use crate::patterns::extract_search_plan;
use crate::rephrase::rephrase_query;
use crate::rerank::rerank;
use crate::retriever::{batch_retrieve_settled, BatchOutcome, Retriever};
use crate::sink::OutputSink;
use crate::summarize::summarize;
use crate::synthesize::{build_answer_messages, synthesize};
use crate::types::{ChatHistory, ErrorContext, FixRequest, ScoredResult, SearchPlan, SearchResult, TokenUsage};

/// A retriever together with what to search and how many results to keep
#[derive(Clone)]
pub struct SourceBinding {
    pub retriever: Arc<dyn Retriever>,
    pub repository: String,
    pub limit: Option<usize>,
}

impl SourceBinding {
    pub fn new(retriever: Arc<dyn Retriever>, repository: impl Into<String>) -> Self {
        Self {
            retriever,
            repository: repository.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

impl std::fmt::Debug for SourceBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBinding")
            .field("retriever", &self.retriever.name())
            .field("repository", &self.repository)
            .field("limit", &self.limit)
            .finish()
    }
}

/// A query a source could not answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub query: String,
    pub error: String,
}

/// Everything one request produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub request_id: String,
    pub error_context: ErrorContext,
    pub rephrased_query: String,
    pub search_plan: SearchPlan,
    /// Candidates retrieved before reranking
    pub candidates: usize,
    pub retained: Vec<ScoredResult>,
    pub summaries: Vec<String>,
    pub answer: String,
    pub usage: TokenUsage,
    pub source_failures: Vec<SourceFailure>,
    /// Set by [`Troubleshooter::handle`] when the request failed
    pub error: Option<String>,
}

pub struct Troubleshooter {
    model: Arc<dyn ChatModel>,
    sources: Vec<SourceBinding>,
    log_source: Arc<dyn LogSource>,
    config: PipelineConfig,
    bulkhead: Bulkhead,
}

impl Troubleshooter {
    pub fn new(model: Arc<dyn ChatModel>, log_source: Arc<dyn LogSource>, config: PipelineConfig) -> Self {
        let bulkhead = Bulkhead::new("fix_pipeline", config.max_concurrency);
        Self {
            model,
            sources: Vec::new(),
            log_source,
            config,
            bulkhead,
        }
    }

    /// Add a retrieval source. Results are merged in the order sources
    /// were added.
    pub fn with_source(mut self, binding: SourceBinding) -> Self {
        self.sources.push(binding);
        self
    }

    pub fn sources(&self) -> &[SourceBinding] {
        &self.sources
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request through every stage
    pub async fn run(
        &self,
        request: &FixRequest,
        sink: &dyn OutputSink,
        cancel: CancellationToken,
    ) -> Result<FixReport> {
        let session = self.session(cancel);
        let mut report = self.execute(&session, request, sink).await?;
        report.usage = session.usage();
        Ok(report)
    }

    /// Run one request and report any failure to the user through `sink`
    /// instead of returning it.
    pub async fn handle(
        &self,
        request: &FixRequest,
        sink: &dyn OutputSink,
        cancel: CancellationToken,
    ) -> FixReport {
        let session = self.session(cancel);
        let mut report = match self.execute(&session, request, sink).await {
            Ok(report) => report,
            Err(e) => {
                if e.is_cancelled() {
                    info!("Fix request cancelled");
                } else {
                    error!("Fix request failed: {}", e);
                }

                let message = e.user_message();
                sink.markdown(&format!("\n\n**Sorry, I couldn't finish troubleshooting.** {}\n", message));
                FixReport {
                    error: Some(message),
                    ..FixReport::default()
                }
            }
        };

        report.usage = session.usage();
        report
    }

    fn session(&self, cancel: CancellationToken) -> ModelSession {
        ModelSession::new(self.model.clone(), self.config.chat_model.as_str(), cancel)
    }

    async fn execute(&self, session: &ModelSession, request: &FixRequest, sink: &dyn OutputSink) -> Result<FixReport> {
        let request_id = generate_request_id();
        info!("Fix request {} started", request_id);
        let history = ChatHistory::from_turns(&request.history);

        begin_stage(session, sink, "Retrieving error context...")?;
        let error_context = extract_error_context(session, &history, &request.query).await?;

        begin_stage(session, sink, "Retrieving output log...")?;
        let output_log = self.log_source.recent_lines(self.config.log_tail_lines).await?;

        begin_stage(session, sink, "Rephrasing query...")?;
        let rephrased_query = rephrase_query(session, &history, &request.query).await?;

        begin_stage(session, sink, "Extracting search patterns...")?;
        let search_plan = extract_search_plan(session, &error_context, &output_log, &rephrased_query).await?;

        begin_stage(session, sink, "Retrieving search results...")?;
        let (candidates, source_failures) = self.retrieve_all(session, &search_plan).await?;

        begin_stage(session, sink, "Reranking search results...")?;
        let retained = rerank(
            session,
            &candidates,
            &error_context,
            &rephrased_query,
            self.config.rerank_threshold,
            &self.bulkhead,
        )
        .await?;

        begin_stage(session, sink, "Summarizing search results...")?;
        let kept: Vec<SearchResult> = retained.iter().map(|s| s.result.clone()).collect();
        let summaries = summarize(session, &kept, &rephrased_query, &self.bulkhead).await?;

        begin_stage(session, sink, "Generating response...")?;
        let messages = build_answer_messages(&error_context, &summaries, &output_log, &rephrased_query);
        let answer = synthesize(session, &messages, sink, self.config.streaming).await?;

        info!(
            "Fix request {} finished: {} candidate(s), {} kept, {} source failure(s)",
            request_id,
            candidates.len(),
            retained.len(),
            source_failures.len()
        );

        Ok(FixReport {
            request_id,
            error_context,
            rephrased_query,
            search_plan,
            candidates: candidates.len(),
            retained,
            summaries,
            answer,
            usage: session.usage(),
            source_failures,
            error: None,
        })
    }

    /// Query every source concurrently. A failing query is recorded and
    /// the rest of the results are kept; output is source-major in
    /// binding order.
    async fn retrieve_all(
        &self,
        session: &ModelSession,
        plan: &SearchPlan,
    ) -> Result<(Vec<SearchResult>, Vec<SourceFailure>)> {
        if plan.is_empty() || self.sources.is_empty() {
            info!("Nothing to retrieve");
            return Ok((Vec::new(), Vec::new()));
        }

        let fetches = self.sources.iter().map(|source| {
            batch_retrieve_settled(
                source.retriever.as_ref(),
                &source.repository,
                &plan.search_patterns,
                source.limit,
                &self.bulkhead,
            )
        });

        let outcomes: Vec<BatchOutcome> = tokio::select! {
            biased;
            _ = session.cancel_token().cancelled() => return Err(FixError::Cancelled),
            outcomes = join_all(fetches) => outcomes,
        };

        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            info!("{} contributed {} result(s)", source.retriever.name(), outcome.results.len());
            candidates.extend(outcome.results);
            for failure in outcome.failures {
                failures.push(SourceFailure {
                    source: source.retriever.name().to_string(),
                    query: failure.query,
                    error: failure.error.to_string(),
                });
            }
        }

        Ok((candidates, failures))
    }
}

fn begin_stage(session: &ModelSession, sink: &dyn OutputSink, message: &str) -> Result<()> {
    session.ensure_active()?;
    sink.progress(message);
    Ok(())
}
