//! Data model shared by the pipeline stages

use std::ops::AddAssign;

use copilot_sdk::core::Usage;
use serde::{Deserialize, Deserializer, Serialize};

/// Reads `null` as the type's default, so `"stack": null` becomes `""`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Structured description of the error a user is asking about.
///
/// Every field is a string; an unknown field is `""`, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorContext {
    /// Dotted `area.Name` code, e.g. `teamsApp.MissingEnvironmentVariablesError`
    #[serde(deserialize_with = "null_as_default")]
    pub error_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stack: String,
    #[serde(deserialize_with = "null_as_default")]
    pub help_link: String,
}

impl ErrorContext {
    pub fn is_empty(&self) -> bool {
        self.error_code.is_empty()
            && self.message.is_empty()
            && self.stack.is_empty()
            && self.help_link.is_empty()
    }

    /// JSON form embedded into prompts
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One turn of the raw conversation as the host records it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum ConversationTurn {
    Request(String),
    Response(String),
}

/// A user message paired with the assistant reply that followed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
}

impl ChatTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Prior conversation, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory(Vec<ChatTurn>);

impl ChatHistory {
    pub fn new(turns: Vec<ChatTurn>) -> Self {
        Self(turns)
    }

    /// Pair every request with the response immediately after it.
    /// Requests without a reply and stray responses are skipped.
    pub fn from_turns(turns: &[ConversationTurn]) -> Self {
        let mut paired = Vec::new();
        let mut i = 0;
        while i + 1 < turns.len() {
            match (&turns[i], &turns[i + 1]) {
                (ConversationTurn::Request(user), ConversationTurn::Response(assistant)) => {
                    paired.push(ChatTurn::new(user.clone(), assistant.clone()));
                    i += 2;
                }
                _ => i += 1,
            }
        }
        Self(paired)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.0
    }

    /// JSON array of `{user, assistant}` objects, as embedded into prompts
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

/// One troubleshooting request from the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRequest {
    /// The user's message, possibly a raw error-context JSON object
    pub query: String,

    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl FixRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }
}

/// What to search for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPlan {
    #[serde(deserialize_with = "null_as_default")]
    pub error_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub search_patterns: Vec<String>,
}

impl SearchPlan {
    pub fn is_empty(&self) -> bool {
        self.search_patterns.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueComment {
    pub author: String,
    pub body: String,
}

/// A GitHub issue with its most recent comments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueResult {
    pub url: String,
    pub title: String,
    pub body: String,
    pub state: String,
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaAnswer {
    pub body: String,
    pub is_accepted: bool,
}

/// A question-and-answer post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaResult {
    pub url: String,
    pub title: String,
    pub body: String,
    pub answers: Vec<QaAnswer>,
}

/// A retrieved candidate document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchResult {
    Issue(IssueResult),
    Qa(QaResult),
}

impl SearchResult {
    /// Source identity of the document
    pub fn url(&self) -> &str {
        match self {
            SearchResult::Issue(issue) => &issue.url,
            SearchResult::Qa(post) => &post.url,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SearchResult::Issue(issue) => &issue.title,
            SearchResult::Qa(post) => &post.title,
        }
    }

    pub fn is_issue(&self) -> bool {
        matches!(self, SearchResult::Issue(_))
    }

    /// JSON form embedded into prompts
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A candidate with its relevance score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub result: SearchResult,
    /// 0 irrelevant, 1 somewhat relevant, 2 highly relevant
    pub score: u8,
}

/// Tokens consumed by one request across all model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl AddAssign<Usage> for TokenUsage {
    fn add_assign(&mut self, usage: Usage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
    }
}
