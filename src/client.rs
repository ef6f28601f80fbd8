//! Exa API client.
//!
//! [`ExaApi`] is the seam between the mode services and the network: the
//! HTTP implementation is [`ExaClient`], and tests substitute in-memory fakes.
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `POST` | `/search` | search mode |
//! | `POST` | `/answer` | answer and code modes |
//! | `POST` | `/contents` | contents route |
//! | `POST` | `/research/v1` | research task creation |
//! | `GET`  | `/research/v1/{id}` | research task status |
//!
//! Every request carries the `x-api-key` header. Non-2xx responses become
//! [`ScoutError::Upstream`] with the response body appended; payloads that
//! fail to decode become [`ScoutError::Schema`]. The reqwest client is built
//! once with the configured per-call timeout.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ExaConfig;
use crate::error::ScoutError;
use crate::models::{
    ExaAnswerResponse, ExaContentsResponse, ExaResearchStatus, ExaResearchTask,
    ExaSearchResponse, SearchType,
};

// ═══════════════════════════════════════════════════════════════════════
// Request shapes
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOptions {
    pub max_characters: u32,
    pub include_html_tags: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightOptions {
    pub num_sentences: u32,
    pub highlights_per_url: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryOptions {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentOptions {
    pub text: TextOptions,
    pub highlights: HighlightOptions,
    pub summary: SummaryOptions,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    #[serde(rename = "type")]
    pub search_type: SearchType,
    pub num_results: u32,
    pub use_autoprompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub contents: ContentOptions,
}

/// Body of `POST /answer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerParams {
    pub query: String,
    pub text: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Body of `POST /contents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentsParams {
    pub ids: Vec<String>,
    #[serde(flatten)]
    pub contents: ContentOptions,
}

/// Body of `POST /research/v1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchParams {
    pub instructions: String,
    pub model: String,
}

// ═══════════════════════════════════════════════════════════════════════
// ExaApi trait
// ═══════════════════════════════════════════════════════════════════════

/// Remote search/answer/research capability.
///
/// Implementations perform exactly one remote call per method and never
/// retry.
#[async_trait]
pub trait ExaApi: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<ExaSearchResponse, ScoutError>;

    async fn answer(&self, params: &AnswerParams) -> Result<ExaAnswerResponse, ScoutError>;

    async fn contents(&self, params: &ContentsParams) -> Result<ExaContentsResponse, ScoutError>;

    async fn research_create(&self, params: &ResearchParams)
        -> Result<ExaResearchTask, ScoutError>;

    async fn research_status(&self, task_id: &str) -> Result<ExaResearchStatus, ScoutError>;
}

// ═══════════════════════════════════════════════════════════════════════
// HTTP implementation
// ═══════════════════════════════════════════════════════════════════════

const API_ERROR: &str = "Exa API error";
const RESEARCH_API_ERROR: &str = "Exa Research API error";

/// reqwest-backed [`ExaApi`].
pub struct ExaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExaClient {
    /// Builds a client for `config.base_url` authenticating with `api_key`.
    pub fn new(config: &ExaConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("exa-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, prefix: &str) -> Result<T, ScoutError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(path, "POST to Exa");
        let request = self
            .http
            .post(self.url(path))
            .header("x-api-key", &self.api_key)
            .json(body);
        self.execute(request, prefix).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        prefix: &str,
    ) -> Result<T, ScoutError> {
        let response = request.send().await.map_err(|e| transport_error(prefix, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ScoutError::Upstream(format!(
                "{}: {}: {}",
                prefix,
                status,
                body_text.trim()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(prefix, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ScoutError::Schema(e.to_string()))
    }
}

fn transport_error(prefix: &str, err: reqwest::Error) -> ScoutError {
    if err.is_timeout() {
        ScoutError::Upstream(format!("{}: request timed out", prefix))
    } else {
        ScoutError::Upstream(format!("{}: {}", prefix, err))
    }
}

#[async_trait]
impl ExaApi for ExaClient {
    async fn search(&self, params: &SearchParams) -> Result<ExaSearchResponse, ScoutError> {
        self.post_json("/search", params, API_ERROR).await
    }

    async fn answer(&self, params: &AnswerParams) -> Result<ExaAnswerResponse, ScoutError> {
        self.post_json("/answer", params, API_ERROR).await
    }

    async fn contents(&self, params: &ContentsParams) -> Result<ExaContentsResponse, ScoutError> {
        self.post_json("/contents", params, API_ERROR).await
    }

    async fn research_create(
        &self,
        params: &ResearchParams,
    ) -> Result<ExaResearchTask, ScoutError> {
        self.post_json("/research/v1", params, RESEARCH_API_ERROR)
            .await
    }

    async fn research_status(&self, task_id: &str) -> Result<ExaResearchStatus, ScoutError> {
        tracing::debug!(task_id, "GET research status");
        let request = self
            .http
            .get(self.url(&format!("/research/v1/{}", task_id)))
            .header("x-api-key", &self.api_key);
        self.execute(request, RESEARCH_API_ERROR).await
    }
}
