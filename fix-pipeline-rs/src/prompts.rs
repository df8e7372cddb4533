//! Prompt templates for every model call of the pipeline
//!
//! Templates use `{{name}}` placeholders (inner whitespace allowed) that
//! are filled by [`render`] in a single pass, so text substituted into a
//! template is never itself expanded.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Question assumed when the user gave none
pub const DEFAULT_QUESTION: &str = "How do I fix this error?";

pub const TROUBLESHOOTING_PERSONA: &str = "You are an expert in troubleshooting Microsoft Teams app development with Teams Toolkit. Users come to you with errors and problems they hit while building, provisioning, deploying or debugging Teams apps, and you advise them on how to resolve them.";

pub const PARSE_ERROR_CONTEXT: &str = r#"
<Instruction>
1. Read the conversation history and the latest user input below and pull out the details of the error the user is dealing with.
2. Reply with a single JSON object and nothing else, shaped like {"errorCode": "area.ErrorName", "message": "what went wrong", "stack": "stack trace", "helpLink": "https://aka.ms/teamsfx-docs"}.
3. errorCode has the form "area.ErrorName", for example "armDeploy.DeploymentError" or "teamsApp.MissingEnvironmentVariablesError". It often appears inside square brackets "[]".
4. message is the full description of the error.
5. stack is the stack trace printed when the error occurred.
6. helpLink is a link to documentation that may explain how to resolve the error.
7. Use "" for any field you cannot find. If nothing can be found at all, reply with {}.
</Instruction>

Conversation history:
{{chat_history}}

User input: {{chat_input}}
Error context:
"#;

pub const REPHRASE_QUERY: &str = r#"
system:
* Given the conversation history and the user's latest message, rewrite the message as a question that can be understood without the history.
If the history is empty or unrelated, restate the original question.
Do not add details that are not needed to ask the question.

Conversation history:
{{chat_history}}

Latest message: {{chat_input}}
Standalone question:
"#;

pub const GET_SEARCH_PATTERNS: &str = r#"
<Instruction>
1. Study the error context, the output log and the user input below to work out the actual problem.
2. If an error code of the form "area.ErrorName" (often inside square brackets "[]") appears in the error context or the output log, report it as errorCode.
3. The output log can contain unrelated lines. Ignore them and keep only what identifies the problem.
4. Produce a few short search patterns (keywords or phrases) that would find a solution to this problem in a web or issue search.
5. When an error code exists, always include it as one of the search patterns.
6. Reply with a single JSON object and nothing else, shaped like {"errorCode": "area.ErrorName", "searchPatterns": ["pattern one", "pattern two"]}.
7. If nothing useful can be found, reply with {"errorCode": "", "searchPatterns": []}.
</Instruction>

<Error Context>
{{errorContext}}
</Error Context>

<Output Log>
{{outputLog}}
</Output Log>

<User Input>
{{userInput}}
</User Input>

Your answer:
"#;

pub const TROUBLESHOOTING: &str = r#"
<Instruction>
1. Read the rephrased user query to understand what the user needs.
2. The output log is the primary record of what happened; treat it as the original error information. If it suggests a fix, weigh that suggestion heavily.
3. The search results summarize issues and posts found for this problem. Use them when they are not empty.
4. Give a detailed answer based on the error context, the output log, the search results and the rephrased query.
5. If an error code appears in the error context or the output log, mention it in the answer.
6. Include links from the output log and the search results whenever they are relevant.
</Instruction>

<Error Context>
{{errorContext}}
</Error Context>

<Search Results>
{{searchResults}}
</Search Results>

<Output Log>
{{outputLog}}
</Output Log>

<Rephrased User Query>
{{rephrasedQuery}}
</Rephrased User Query>

Your answer:
"#;

pub const RERANK: &str = r#"
<Instruction>
1. The search result below was retrieved for the error described in the error context.
2. The question is what the user wants answered. If it is empty, the question is "how to fix the error".
3. Judge how relevant the search result is to the error context and the question.
4. Score 0 means irrelevant, 1 means somewhat relevant, 2 means highly relevant.
5. Reply with the score digit only: "0", "1" or "2".
</Instruction>

<Search Result>
{{searchResult}}
</Search Result>

<Error Context>
{{errorContext}}
</Error Context>

<Question>
{{question}}
</Question>

Score:
"#;

pub const SUMMARIZE_ISSUE: &str = r#"
<Instruction>
1. The GitHub issue below was found while investigating the user's question.
2. Summarize the problem it reports and, above all, how it was resolved. The latest comments usually hold the resolution.
3. Keep error codes, commands, settings and links exactly as written.
4. If the issue contains no resolution, say so in one sentence.
</Instruction>

<Issue>
{{searchResult}}
</Issue>

<Question>
{{question}}
</Question>

Summary:
"#;

pub const SUMMARIZE_QA: &str = r#"
<Instruction>
1. The question-and-answer post below was found while investigating the user's question.
2. Summarize the question and the solution. Prefer the accepted answer; mention other answers only when they add a different fix.
3. Keep error codes, commands, settings and links exactly as written.
</Instruction>

<Post>
{{searchResult}}
</Post>

<Question>
{{question}}
</Question>

Summary:
"#;

/// Fill `{{name}}` placeholders from `values`. Unknown placeholders are
/// left untouched.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let values: HashMap<&str, &str> = values.iter().copied().collect();
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// The question to ask on behalf of the user
pub fn question_or_default(question: &str) -> &str {
    if question.trim().is_empty() {
        DEFAULT_QUESTION
    } else {
        question
    }
}
