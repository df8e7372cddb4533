// fix-pipeline-rs/src/bin/crawl_issues.rs
// Crawls every issue matching a query and writes one JSON file per issue,
// comments included.

use std::path::PathBuf;

use anyhow::Context;
use copilot_sdk::config::DEFAULT_PROVIDER;
use copilot_sdk::github::GithubClient;
use dotenv::dotenv;
use fix_pipeline::SearchResult;
use log::info;

const DEFAULT_REPOSITORY: &str = "OfficeDev/teams-toolkit";
const DEFAULT_QUERY: &str = "is:issue is:closed";
const DEFAULT_MAX_PAGES: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // crawl-issues [output_dir] [repository] [query] [max_pages]
    let mut args = std::env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "./issues".to_string()));
    let repository = args.next().unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
    let query = args.next().unwrap_or_else(|| DEFAULT_QUERY.to_string());
    let max_pages = match args.next() {
        Some(value) => value.parse().context("max_pages must be a positive integer")?,
        None => DEFAULT_MAX_PAGES,
    };

    let client = GithubClient::from_provider(DEFAULT_PROVIDER.as_ref()).context("Invalid GitHub configuration")?;
    let issues = client
        .crawl_issues(&repository, &query, max_pages)
        .await
        .with_context(|| format!("Failed to crawl issues of {}", repository))?;

    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for found in issues.iter() {
        let path = output_dir.join(format!("{}.json", found.issue.number));
        let document = serde_json::to_vec_pretty(&SearchResult::from(found.clone()))?;
        tokio::fs::write(&path, document)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!("Wrote {} issue(s) to {}", issues.len(), output_dir.display());
    Ok(())
}
