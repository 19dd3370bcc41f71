//! Environment-driven configuration.
//!
//! Client side:
//! - `TASKBOARD_URL` - API base URL (default: `http://localhost:8000/api`)
//! - `TASKBOARD_TOKEN` - bearer credential attached to every request
//!
//! Server side:
//! - `TASKBOARD_API_KEY` - when set, every route except health requires it
//! - `TASKBOARD_DB` - database file (default: platform data dir)
//! - `TASKBOARD_DECOMPOSER_URL` - OpenAI-compatible chat completions endpoint
//! - `TASKBOARD_DECOMPOSER_MODEL` - model name sent to that endpoint

use std::path::PathBuf;

pub const DEFAULT_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DECOMPOSER_MODEL: &str = "local-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TASKBOARD_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            token: non_empty_var("TASKBOARD_TOKEN"),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub database_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub decomposer: DecomposerConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            database_path: non_empty_var("TASKBOARD_DB").map(PathBuf::from),
            api_key: non_empty_var("TASKBOARD_API_KEY"),
            decomposer: DecomposerConfig::from_env(),
        }
    }
}

/// Which brain-dump decomposer the server uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DecomposerConfig {
    /// Split on line breaks and semicolons.
    #[default]
    Split,
    /// Ask a chat completions endpoint.
    Chat { url: String, model: String },
}

impl DecomposerConfig {
    pub fn from_env() -> Self {
        match non_empty_var("TASKBOARD_DECOMPOSER_URL") {
            Some(url) => Self::Chat {
                url,
                model: non_empty_var("TASKBOARD_DECOMPOSER_MODEL")
                    .unwrap_or_else(|| DEFAULT_DECOMPOSER_MODEL.to_string()),
            },
            None => Self::Split,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
