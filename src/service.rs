//! Mode services.
//!
//! [`Scout`] holds the configuration and the Exa client and implements one
//! operation per route: validate the request, check the credential, make a
//! single remote call, shape the payload. The HTTP server and the CLI both
//! call through here, so the two surfaces cannot drift apart.
//!
//! Input validation always runs before the credential check; a missing
//! credential fails with [`ScoutError::ConfigurationMissing`] before any
//! network activity.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::{
    AnswerParams, ContentOptions, ContentsParams, ExaApi, ExaClient, HighlightOptions,
    SearchParams, SummaryOptions, TextOptions,
};
use crate::config::Config;
use crate::context::build_query_with_context;
use crate::error::ScoutError;
use crate::models::{
    AnswerRequest, AnswerResponse, CodeRequest, ContentsRequest, ContentsResponse,
    ConversationEntry, Mode, ResearchRequest, SearchRequest, SearchResponse,
};
use crate::research::{PollSchedule, ResearchOutcome, ResearchPoller};
use crate::session::Payload;
use crate::shape::{shape_answer, shape_contents, shape_search};

/// System prompt sent with every code-mode question.
pub const CODE_SYSTEM_PROMPT: &str = "You are an expert programming assistant. Focus on:
- Providing accurate, working code examples
- Explaining code concepts clearly
- Following best practices and modern patterns
- Including relevant documentation links when helpful
- Using proper code formatting with language tags

When answering coding questions:
1. Start with a brief explanation
2. Provide complete, runnable code examples
3. Explain key parts of the code
4. Mention potential edge cases or improvements

If the user refers to previous code or questions, use the provided context to give a relevant answer.";

const QUERY_REQUIRED: &str = "Query is required";
const IDS_REQUIRED: &str = "IDs are required";
const INSTRUCTIONS_REQUIRED: &str = "Instructions are required";

#[derive(Clone)]
pub struct Scout {
    config: Arc<Config>,
    /// `None` when no credential was configured.
    api: Option<Arc<dyn ExaApi>>,
}

impl Scout {
    /// Builds the HTTP client when the config carries a credential.
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let api: Option<Arc<dyn ExaApi>> = match config.exa.api_key.as_deref() {
            Some(key) => Some(Arc::new(ExaClient::new(&config.exa, key)?)),
            None => {
                tracing::warn!(
                    env = %config.exa.api_key_env,
                    "no Exa API key configured; every request will fail"
                );
                None
            }
        };
        Ok(Self { config, api })
    }

    /// Uses `api` regardless of the configured credential.
    pub fn with_api(config: Arc<Config>, api: Arc<dyn ExaApi>) -> Self {
        Self {
            config,
            api: Some(api),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn api(&self) -> Result<&Arc<dyn ExaApi>, ScoutError> {
        self.api.as_ref().ok_or(ScoutError::ConfigurationMissing)
    }

    // ============ search ============

    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, ScoutError> {
        let query = require_query(req.query)?;
        let num_results = req.num_results.unwrap_or(self.config.search.num_results);
        if !(1..=100).contains(&num_results) {
            return Err(ScoutError::InvalidInput(
                "numResults must be between 1 and 100".to_string(),
            ));
        }
        let api = self.api()?;

        let search = &self.config.search;
        let params = SearchParams {
            search_type: req.search_type.unwrap_or(search.search_type),
            num_results,
            use_autoprompt: req.use_autoprompt.unwrap_or(search.use_autoprompt),
            start_published_date: req.start_published_date,
            end_published_date: req.end_published_date,
            include_domains: req.include_domains,
            exclude_domains: req.exclude_domains,
            category: req.category,
            contents: ContentOptions {
                text: TextOptions {
                    max_characters: search.text_max_characters,
                    include_html_tags: false,
                },
                highlights: HighlightOptions {
                    num_sentences: search.highlight_sentences,
                    highlights_per_url: search.highlights_per_url,
                },
                summary: SummaryOptions {
                    query: query.clone(),
                },
            },
            query,
        };

        let response = shape_search(api.search(&params).await?)?;
        tracing::info!(results = response.results.len(), "search completed");
        Ok(response)
    }

    // ============ answer ============

    pub async fn answer(&self, req: AnswerRequest) -> Result<AnswerResponse, ScoutError> {
        let query = require_query(req.query)?;
        let api = self.api()?;

        let params = AnswerParams {
            query,
            text: true,
            model: self.config.answer.model.clone(),
            system_prompt: None,
        };
        let response = shape_answer(api.answer(&params).await?)?;
        tracing::info!(citations = response.citations.len(), "answer completed");
        Ok(response)
    }

    // ============ code ============

    /// Answers a programming question, folding prior turns into the query.
    pub async fn code(&self, req: CodeRequest) -> Result<AnswerResponse, ScoutError> {
        let query = require_query(req.query)?;
        let api = self.api()?;

        let params = AnswerParams {
            query: build_query_with_context(&query, &req.conversation_history),
            text: true,
            model: self.config.answer.model.clone(),
            system_prompt: Some(
                self.config
                    .code
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| CODE_SYSTEM_PROMPT.to_string()),
            ),
        };
        let response = shape_answer(api.answer(&params).await?)?;
        tracing::info!(
            history = req.conversation_history.len(),
            citations = response.citations.len(),
            "code answer completed"
        );
        Ok(response)
    }

    // ============ contents ============

    pub async fn contents(&self, req: ContentsRequest) -> Result<ContentsResponse, ScoutError> {
        let ids: Vec<String> = req
            .ids
            .into_iter()
            .filter(|id| !id.trim().is_empty())
            .collect();
        if ids.is_empty() {
            return Err(ScoutError::InvalidInput(IDS_REQUIRED.to_string()));
        }
        let api = self.api()?;

        let contents = &self.config.contents;
        let params = ContentsParams {
            ids,
            contents: ContentOptions {
                text: TextOptions {
                    max_characters: contents.text_max_characters,
                    include_html_tags: false,
                },
                highlights: HighlightOptions {
                    num_sentences: contents.highlight_sentences,
                    highlights_per_url: contents.highlights_per_url,
                },
                summary: SummaryOptions {
                    query: String::new(),
                },
            },
        };
        shape_contents(api.contents(&params).await?)
    }

    // ============ research ============

    pub fn research_poller(&self) -> Result<ResearchPoller, ScoutError> {
        let api = self.api()?.clone();
        Ok(ResearchPoller::new(
            api,
            self.config.research.model.clone(),
            PollSchedule::from(&self.config.research),
        ))
    }

    /// Runs a research task to completion, failure, timeout, or cancellation.
    pub async fn research(
        &self,
        req: ResearchRequest,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, ScoutError> {
        let instructions = require_instructions(req.instructions)?;
        let poller = self.research_poller()?;
        poller.run(&instructions, cancel).await
    }

    // ============ dispatch ============

    /// Runs the operation for `mode` on behalf of an interactive session.
    ///
    /// A research timeout is reported as [`ScoutError::TimedOut`] here since
    /// the session renders it as a message error.
    pub async fn dispatch(
        &self,
        mode: Mode,
        query: String,
        history: Vec<ConversationEntry>,
        cancel: &CancellationToken,
    ) -> Result<Payload, ScoutError> {
        match mode {
            Mode::Search => {
                let req = SearchRequest {
                    query: Some(query),
                    ..SearchRequest::default()
                };
                self.search(req).await.map(Payload::Results)
            }
            Mode::Answer => self
                .answer(AnswerRequest { query: Some(query) })
                .await
                .map(Payload::Answer),
            Mode::Code => self
                .code(CodeRequest {
                    query: Some(query),
                    conversation_history: history,
                })
                .await
                .map(Payload::Answer),
            Mode::Research => {
                let req = ResearchRequest {
                    instructions: Some(serde_json::Value::String(query)),
                };
                match self.research(req, cancel).await? {
                    ResearchOutcome::Completed(report) => Ok(Payload::Research(report)),
                    ResearchOutcome::TimedOut { task_id, attempts } => {
                        Err(ScoutError::TimedOut { task_id, attempts })
                    }
                }
            }
        }
    }
}

fn require_query(query: Option<String>) -> Result<String, ScoutError> {
    query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ScoutError::InvalidInput(QUERY_REQUIRED.to_string()))
}

fn require_instructions(value: Option<serde_json::Value>) -> Result<String, ScoutError> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s),
        _ => Err(ScoutError::InvalidInput(INSTRUCTIONS_REQUIRED.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scout_without_key() -> Scout {
        Scout::from_config(Arc::new(Config::default())).unwrap()
    }

    #[test]
    fn test_require_query() {
        assert!(require_query(None).is_err());
        assert!(require_query(Some(" \t".into())).is_err());
        assert_eq!(require_query(Some(" rust ".into())).unwrap(), " rust ");
    }

    #[test]
    fn test_require_instructions_must_be_text() {
        assert!(require_instructions(Some(json!(42))).is_err());
        assert!(require_instructions(Some(json!(["a"]))).is_err());
        assert!(require_instructions(Some(json!(""))).is_err());
        assert_eq!(
            require_instructions(Some(json!("summarize X"))).unwrap(),
            "summarize X"
        );
    }

    #[tokio::test]
    async fn test_validation_precedes_credential_check() {
        let scout = scout_without_key();
        let err = scout.answer(AnswerRequest { query: None }).await.unwrap_err();
        assert_eq!(err, ScoutError::InvalidInput(QUERY_REQUIRED.into()));

        let err = scout
            .answer(AnswerRequest {
                query: Some("hello".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ScoutError::ConfigurationMissing);
    }

    #[tokio::test]
    async fn test_missing_credential_for_every_mode() {
        let scout = scout_without_key();
        let cancel = CancellationToken::new();
        for mode in [Mode::Search, Mode::Answer, Mode::Code, Mode::Research] {
            let err = scout
                .dispatch(mode, "q".into(), Vec::new(), &cancel)
                .await
                .unwrap_err();
            assert_eq!(err, ScoutError::ConfigurationMissing, "mode {}", mode);
        }
    }

    #[tokio::test]
    async fn test_num_results_range() {
        let scout = scout_without_key();
        let err = scout
            .search(SearchRequest {
                query: Some("rust".into()),
                num_results: Some(0),
                ..SearchRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_blank_ids_rejected() {
        let scout = scout_without_key();
        let err = scout
            .contents(ContentsRequest {
                ids: vec!["  ".into()],
            })
            .await
            .unwrap_err();
        assert_eq!(err, ScoutError::InvalidInput(IDS_REQUIRED.into()));
    }
}
