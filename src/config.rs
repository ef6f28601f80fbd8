//! TOML configuration.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below, which match the hosted Exa API. The API key is never
//! stored in the file: [`Config::resolve_environment`] reads it once at
//! startup from the variable named by `exa.api_key_env`.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [exa]
//! base_url = "https://api.exa.ai"
//! timeout_secs = 60
//!
//! [research]
//! poll_interval_secs = 10
//! max_attempts = 60
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::SearchType;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub exa: ExaConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub contents: ContentsConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub code: CodeConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Filled from the environment, never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ExaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.exa.ai".to_string()
}
fn default_api_key_env() -> String {
    "EXA_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

impl ExaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_num_results")]
    pub num_results: u32,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default = "default_true")]
    pub use_autoprompt: bool,
    #[serde(default = "default_search_text_chars")]
    pub text_max_characters: u32,
    #[serde(default = "default_search_sentences")]
    pub highlight_sentences: u32,
    #[serde(default = "default_search_sentences")]
    pub highlights_per_url: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_results: default_num_results(),
            search_type: SearchType::default(),
            use_autoprompt: true,
            text_max_characters: default_search_text_chars(),
            highlight_sentences: default_search_sentences(),
            highlights_per_url: default_search_sentences(),
        }
    }
}

fn default_num_results() -> u32 {
    10
}
fn default_true() -> bool {
    true
}
fn default_search_text_chars() -> u32 {
    500
}
fn default_search_sentences() -> u32 {
    3
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContentsConfig {
    #[serde(default = "default_contents_text_chars")]
    pub text_max_characters: u32,
    #[serde(default = "default_contents_sentences")]
    pub highlight_sentences: u32,
    #[serde(default = "default_contents_sentences")]
    pub highlights_per_url: u32,
}

impl Default for ContentsConfig {
    fn default() -> Self {
        Self {
            text_max_characters: default_contents_text_chars(),
            highlight_sentences: default_contents_sentences(),
            highlights_per_url: default_contents_sentences(),
        }
    }
}

fn default_contents_text_chars() -> u32 {
    10_000
}
fn default_contents_sentences() -> u32 {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_model")]
    pub model: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            model: default_answer_model(),
        }
    }
}

fn default_answer_model() -> String {
    "exa".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CodeConfig {
    /// Replaces the built-in programming-assistant prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResearchConfig {
    #[serde(default = "default_research_model")]
    pub model: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            model: default_research_model(),
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_research_model() -> String {
    "exa-research-pro".to_string()
}
fn default_poll_interval_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    60
}

impl ResearchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Reads process-wide settings from the environment.
    ///
    /// `EXA_API_BASE` overrides `exa.base_url`; the key variable named by
    /// `exa.api_key_env` supplies the credential. Empty values count as unset.
    pub fn resolve_environment(&mut self) {
        if let Some(base) = non_empty_env("EXA_API_BASE") {
            self.exa.base_url = base;
        }
        self.exa.api_key = non_empty_env(&self.exa.api_key_env);
    }

    pub fn has_credential(&self) -> bool {
        self.exa.api_key.is_some()
    }

    /// Checks ranges on values that would otherwise fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind must not be empty");
        }
        if self.exa.timeout_secs == 0 {
            anyhow::bail!("exa.timeout_secs must be > 0");
        }
        if !(1..=100).contains(&self.search.num_results) {
            anyhow::bail!("search.num_results must be in [1, 100]");
        }
        if self.research.max_attempts == 0 {
            anyhow::bail!("research.max_attempts must be >= 1");
        }
        if self.exa.api_key_env.trim().is_empty() {
            anyhow::bail!("exa.api_key_env must name an environment variable");
        }
        reqwest::Url::parse(&self.exa.base_url)
            .with_context(|| format!("exa.base_url is not a valid URL: {}", self.exa.base_url))?;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    config.resolve_environment();
    config.validate()?;
    Ok(config)
}

/// Loads `path` when given, otherwise the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let mut config = Config::default();
            config.resolve_environment();
            config.validate()?;
            Ok(config)
        }
    }
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}
