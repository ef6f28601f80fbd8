//! Data types that cross the HTTP surface and the Exa API boundary.
//!
//! Three groups live here:
//!
//! - **Requests** accepted by the `/api/*` routes ([`SearchRequest`],
//!   [`AnswerRequest`], [`CodeRequest`], [`ContentsRequest`],
//!   [`ResearchRequest`]).
//! - **Records** returned to callers after shaping ([`SearchResult`],
//!   [`Citation`], [`AnswerResponse`], [`ResearchReport`], ...). These always
//!   carry a non-empty `id`, `url`, and `title`.
//! - **Exa payloads** ([`ExaSearchResponse`], [`ExaAnswerResponse`], ...) as
//!   decoded from the remote API. Optional fields stay optional here; the
//!   [`shape`](crate::shape) module applies fallbacks.
//!
//! All JSON uses camelCase field names.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Decodes a list field, treating an explicit `null` like a missing key.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Modes ============

/// Query intent selecting the remote capability and response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Search,
    Answer,
    Code,
    Research,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Search => "search",
            Mode::Answer => "answer",
            Mode::Code => "code",
            Mode::Research => "research",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Mode::Search),
            "answer" => Ok(Mode::Answer),
            "code" => Ok(Mode::Code),
            "research" => Ok(Mode::Research),
            other => Err(format!(
                "unknown mode '{}': expected search, answer, code, or research",
                other
            )),
        }
    }
}

/// Exa search strategy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Keyword,
    Neural,
    #[default]
    Auto,
}

// ============ Conversation history ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One prior turn of a code-mode conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
}

impl ConversationEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============ Requests ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub num_results: Option<u32>,
    #[serde(default, rename = "type")]
    pub search_type: Option<SearchType>,
    #[serde(default)]
    pub use_autoprompt: Option<bool>,
    #[serde(default)]
    pub start_published_date: Option<String>,
    #[serde(default)]
    pub end_published_date: Option<String>,
    #[serde(default)]
    pub include_domains: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_domains: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conversation_history: Vec<ConversationEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentsRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ids: Vec<String>,
}

/// Research request. `instructions` stays untyped so that a non-string value
/// is reported as invalid input rather than a body parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub instructions: Option<serde_json::Value>,
}

// ============ Records ============

/// A source attribution backing a generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_scores: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoprompt_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Shared response shape of the answer and code routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentsResult {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_scores: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentsResponse {
    pub results: Vec<ContentsResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDollars {
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_searches: Option<f64>,
}

/// Final payload of a completed research task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ResearchOutput>,
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_dollars: Option<CostDollars>,
}

// ============ Exa payloads ============

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaSearchResponse {
    pub results: Vec<ExaResult>,
    #[serde(default)]
    pub autoprompt_string: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// A search or contents hit as returned by Exa.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    #[serde(default)]
    pub highlight_scores: Option<Vec<f64>>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExaCitation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExaAnswerResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<ExaCitation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExaContentsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<ExaResult>,
}

/// Response of the research create call. Exa has used both field names for
/// the task identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaResearchTask {
    #[serde(default)]
    pub research_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Remote lifecycle state of a research task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchState {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaResearchStatus {
    pub status: ResearchState,
    #[serde(default)]
    pub output: Option<ResearchOutput>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<ExaCitation>,
    #[serde(default)]
    pub cost_dollars: Option<CostDollars>,
}
