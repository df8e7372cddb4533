// fix-pipeline-rs/src/main.rs
// Runs one troubleshooting request against the configured backends and
// streams the answer to stdout.

use std::io::{self, Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use copilot_sdk::azure_search::AzureSearchClient;
use copilot_sdk::config::{AzureSearchConfig, GithubConfig, DEFAULT_PROVIDER};
use copilot_sdk::github::GithubClient;
use copilot_sdk::openai::OpenAIClient;
use dotenv::dotenv;
use fix_pipeline::retriever::{GithubRestRetriever, GithubVectorRetriever, StackOverflowRetriever};
use fix_pipeline::{
    FileLogSource, FixRequest, LogSource, OutputSink, PipelineConfig, SourceBinding, StaticLogSource,
    Troubleshooter,
};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

/// Answer on stdout, progress on stderr
struct StdoutSink;

impl OutputSink for StdoutSink {
    fn markdown(&self, fragment: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(fragment.as_bytes());
        let _ = out.flush();
    }

    fn progress(&self, message: &str) {
        eprintln!("> {}", message);
    }
}

fn read_query() -> anyhow::Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }

    let mut query = String::new();
    io::stdin()
        .read_to_string(&mut query)
        .context("Failed to read the query from stdin")?;
    Ok(query.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let query = read_query()?;
    if query.is_empty() {
        bail!("Usage: fix <question or error-context JSON>");
    }

    let provider = DEFAULT_PROVIDER.clone();
    let config = PipelineConfig::from_provider(provider.as_ref()).context("Invalid pipeline configuration")?;
    let llm = Arc::new(OpenAIClient::from_provider(provider.as_ref()).context("Invalid language model configuration")?);

    let log_source: Arc<dyn LogSource> = match &config.output_log_path {
        Some(path) => Arc::new(FileLogSource::new(path)),
        None => Arc::new(StaticLogSource::default()),
    };

    let mut troubleshooter = Troubleshooter::new(llm.clone(), log_source, config.clone());

    let github_config = GithubConfig::from_provider(provider.as_ref()).context("Invalid GitHub configuration")?;
    if github_config.token.is_empty() {
        warn!("No GitHub token configured; skipping GitHub issue search");
    } else {
        let github = Arc::new(GithubClient::new(github_config)?);
        troubleshooter = troubleshooter.with_source(
            SourceBinding::new(Arc::new(GithubRestRetriever::new(github)), config.repository.as_str())
                .with_limit(config.github_rest_limit),
        );
    }

    match AzureSearchConfig::from_provider(provider.as_ref()) {
        Ok(search_config) => {
            let search = Arc::new(AzureSearchClient::new(search_config)?);
            let issues = GithubVectorRetriever::new(llm.clone(), search.clone(), config.embedding_model.as_str());
            let posts = StackOverflowRetriever::new(llm.clone(), search, config.embedding_model.as_str());
            troubleshooter = troubleshooter
                .with_source(
                    SourceBinding::new(Arc::new(issues), config.repository.as_str())
                        .with_limit(config.github_vector_limit),
                )
                .with_source(
                    SourceBinding::new(Arc::new(posts), config.repository.as_str())
                        .with_limit(config.stack_overflow_limit),
                );
        }
        Err(e) => warn!("Azure AI Search not configured ({}); skipping vector search", e),
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = troubleshooter.handle(&FixRequest::new(query), &StdoutSink, cancel).await;
    println!();

    info!(
        "Used {} prompt and {} completion tokens",
        report.usage.prompt_tokens, report.usage.completion_tokens
    );
    for failure in &report.source_failures {
        warn!("{} could not search '{}': {}", failure.source, failure.query, failure.error);
    }

    if let Some(error) = report.error {
        bail!(error);
    }
    Ok(())
}
