//! Test doubles shared by the pipeline tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use copilot_sdk::core::{
    ChatMessage, ChatModel, Completion, CompletionChunk, CompletionStream, ResponseFormat, Usage,
};
use copilot_sdk::error::{Result, ServiceError};
use futures::stream;
use mockall::mock;
use tokio_util::sync::CancellationToken;

use crate::model::ModelSession;
use crate::retriever::Retriever;
use crate::types::{IssueComment, IssueResult, QaAnswer, QaResult, SearchResult};

/// Markers that identify which prompt a call was made with
pub const PARSE_MARKER: &str = "Error context:";
pub const REPHRASE_MARKER: &str = "Standalone question:";
pub const PATTERNS_MARKER: &str = "searchPatterns";
pub const RERANK_MARKER: &str = "Score:";
pub const SUMMARY_MARKER: &str = "Summary:";
pub const ANSWER_MARKER: &str = "<Rephrased User Query>";

pub const USAGE_PER_CALL: Usage = Usage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

struct Rule {
    needles: Vec<String>,
    reply: std::result::Result<String, String>,
}

/// A chat model that answers from a script.
///
/// The first rule whose needles all occur in the request wins; requests
/// matching no rule get the default reply.
pub struct ScriptedModel {
    rules: Vec<Rule>,
    default_reply: String,
    delay: Option<Duration>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: String::new(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply_when(mut self, needles: &[&str], reply: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Ok(reply.to_string()),
        });
        self
    }

    pub fn fail_when(mut self, needles: &[&str], message: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Err(message.to_string()),
        });
        self
    }

    pub fn default_reply(mut self, reply: &str) -> Self {
        self.default_reply = reply.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request, each flattened to the concatenation of its messages
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|messages| flatten(messages))
            .collect()
    }

    /// Requests whose prompt contains `marker`
    pub fn prompts_with(&self, marker: &str) -> Vec<String> {
        self.prompts().into_iter().filter(|p| p.contains(marker)).collect()
    }

    async fn answer(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let prompt = flatten(messages);
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.needles.iter().all(|n| prompt.contains(n.as_str())));

        match rule {
            Some(Rule { reply: Ok(reply), .. }) => Ok(reply.clone()),
            Some(Rule { reply: Err(message), .. }) => Err(ServiceError::authentication(message.clone())),
            None => Ok(self.default_reply.clone()),
        }
    }
}

fn flatten(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _format: ResponseFormat,
    ) -> Result<Completion> {
        let text = self.answer(messages).await?;
        Ok(Completion {
            text,
            usage: USAGE_PER_CALL,
        })
    }

    async fn complete_streaming(&self, _model: &str, messages: &[ChatMessage]) -> Result<CompletionStream> {
        let text = self.answer(messages).await?;

        let mut chunks: Vec<Result<CompletionChunk>> = text
            .split_inclusive(' ')
            .map(|word| {
                Ok(CompletionChunk {
                    text: word.to_string(),
                    usage: None,
                })
            })
            .collect();
        chunks.push(Ok(CompletionChunk {
            text: String::new(),
            usage: Some(USAGE_PER_CALL),
        }));

        Ok(Box::pin(stream::iter(chunks)))
    }
}

mock! {
    pub SearchBackend {}

    #[async_trait]
    impl Retriever for SearchBackend {
        async fn retrieve(&self, repository: &str, query: &str) -> Result<Vec<SearchResult>>;
    }
}

pub fn session(model: std::sync::Arc<ScriptedModel>) -> ModelSession {
    ModelSession::new(model, "gpt-4o", CancellationToken::new())
}

pub fn issue(url: &str, title: &str) -> SearchResult {
    SearchResult::Issue(IssueResult {
        url: url.to_string(),
        title: title.to_string(),
        body: "Provisioning fails with [teamsApp.MissingEnv]".to_string(),
        state: "closed".to_string(),
        comments: vec![IssueComment {
            author: "maintainer".to_string(),
            body: "Add the variable to env/.env.dev".to_string(),
        }],
    })
}

pub fn post(url: &str, title: &str) -> SearchResult {
    SearchResult::Qa(QaResult {
        url: url.to_string(),
        title: title.to_string(),
        body: "How do I set environment variables for Teams Toolkit?".to_string(),
        answers: vec![QaAnswer {
            body: "Use the env folder.".to_string(),
            is_accepted: true,
        }],
    })
}

/// Results whose URLs encode the query and position: `<query>#<i>`
pub fn tagged(query: &str, count: usize) -> Vec<SearchResult> {
    (0..count)
        .map(|i| issue(&format!("{}#{}", query, i), query))
        .collect()
}

pub fn urls(results: &[SearchResult]) -> Vec<String> {
    results.iter().map(|r| r.url().to_string()).collect()
}
