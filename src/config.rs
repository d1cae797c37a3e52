//! TOML configuration parsing and validation.
//!
//! The AI API key is resolved once, at load time, from either `ai.api_key`
//! or the environment variable named by `ai.api_key_env`. After that the
//! [`Config`] is the only source of settings; clients receive what they
//! need at construction.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use doclens_core::search::{SearchParams, DEFAULT_TEXT_MATCH_LIMIT, DEFAULT_TOP_K};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub augment: AugmentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Where document and query embeddings come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSource {
    /// Deterministic offline embedding.
    #[default]
    Local,
    /// The provider's embedding endpoint.
    Remote,
    /// No embeddings; semantic search always degrades to text.
    Disabled,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// `"gemini"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Full URL of the text-generation endpoint.
    #[serde(default)]
    pub generate_url: Option<String>,
    /// Full URL of the embedding endpoint (remote embeddings only).
    #[serde(default)]
    pub embed_url: Option<String>,
    /// Literal API key. Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub embedding: EmbeddingSource,
    /// Expected embedding dimensionality; mismatching vectors are discarded.
    #[serde(default)]
    pub embedding_dims: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            generate_url: None,
            embed_url: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            embedding: EmbeddingSource::default(),
            embedding_dims: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "AI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct AugmentConfig {
    /// Run enrichment after create and content-changing update.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_text_match_limit")]
    pub text_match_limit: usize,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            text_match_limit: DEFAULT_TEXT_MATCH_LIMIT,
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_text_match_limit() -> usize {
    DEFAULT_TEXT_MATCH_LIMIT
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl SearchConfig {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            text_match_limit: self.text_match_limit,
            default_top_k: self.default_top_k,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
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
    "127.0.0.1:4000".to_string()
}

/// Parse and validate a config file, resolving the API key.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    resolve_api_key(&mut config.ai, |name| std::env::var(name).ok());
    validate(&config)?;
    Ok(config)
}

/// Parse config TOML without validation or key resolution.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Fill `ai.api_key` from the environment when it is not set literally.
pub fn resolve_api_key(ai: &mut AiConfig, lookup: impl Fn(&str) -> Option<String>) {
    if ai.api_key.is_none() {
        ai.api_key = lookup(&ai.api_key_env).filter(|k| !k.trim().is_empty());
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.search.text_match_limit == 0 {
        bail!("search.text_match_limit must be > 0");
    }
    if config.search.default_top_k == 0 {
        bail!("search.default_top_k must be > 0");
    }
    if config.ai.timeout_secs == 0 {
        bail!("ai.timeout_secs must be > 0");
    }
    if config.ai.embedding_dims == Some(0) {
        bail!("ai.embedding_dims must be > 0 when set");
    }

    match config.ai.provider.as_str() {
        "disabled" => {
            if config.ai.embedding == EmbeddingSource::Remote {
                bail!("ai.embedding = \"remote\" requires an enabled ai.provider");
            }
        }
        "gemini" => {
            if config.ai.generate_url.is_none() {
                bail!("ai.generate_url must be set when provider is 'gemini'");
            }
            if config.ai.api_key.is_none() {
                bail!(
                    "no API key: set ai.api_key or the {} environment variable",
                    config.ai.api_key_env
                );
            }
            if config.ai.embedding == EmbeddingSource::Remote && config.ai.embed_url.is_none() {
                bail!("ai.embed_url must be set when ai.embedding = \"remote\"");
            }
        }
        other => bail!(
            "Unknown AI provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    Ok(())
}

impl Config {
    /// Config with every default and the given database path.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            ai: AiConfig::default(),
            augment: AugmentConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
