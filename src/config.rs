//! Configuration for boteval.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{BotevalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Blob store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hub hosting the dataset repository
    /// (e.g., "https://huggingface.co")
    pub endpoint: String,

    /// Dataset repository id (e.g., "myorg/boteval-records")
    pub repo_id: String,

    /// Revision to read from and commit to
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Access token; required for uploads and private repositories
    #[serde(default)]
    pub token: String,
}

/// Well-known paths inside the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Canonical question list
    #[serde(default = "default_questions_path")]
    pub questions: String,

    /// Directory of evaluation-document blobs, one per (model, run)
    #[serde(default = "default_compare_dir")]
    pub compare_dir: String,

    /// Directory of response submissions
    #[serde(default = "default_gather_dir")]
    pub gather_dir: String,

    /// Directory of annotation sets
    #[serde(default = "default_annotate_dir")]
    pub annotate_dir: String,
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_questions_path() -> String {
    "questions.json".to_string()
}

fn default_compare_dir() -> String {
    "compare".to_string()
}

fn default_gather_dir() -> String {
    "gather".to_string()
}

fn default_annotate_dir() -> String {
    "annotate".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            repo_id: String::new(),
            revision: default_revision(),
            token: String::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            questions: default_questions_path(),
            compare_dir: default_compare_dir(),
            gather_dir: default_gather_dir(),
            annotate_dir: default_annotate_dir(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Blob store settings
    pub store: StoreConfig,

    /// Repository layout
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    store: Option<StoreFileSection>,
    paths: Option<PathsFileSection>,
}

#[derive(Debug, Deserialize)]
struct StoreFileSection {
    endpoint: Option<String>,
    repo_id: Option<String>,
    revision: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathsFileSection {
    questions: Option<String>,
    compare_dir: Option<String>,
    gather_dir: Option<String>,
    annotate_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (BOTEVAL_ENDPOINT, BOTEVAL_REPO, BOTEVAL_TOKEN)
    /// 2. Config file (~/.config/boteval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        // Override with environment variables
        if let Ok(endpoint) = env::var("BOTEVAL_ENDPOINT") {
            config.store.endpoint = endpoint;
        }

        if let Ok(repo_id) = env::var("BOTEVAL_REPO") {
            config.store.repo_id = repo_id;
        }

        if let Ok(revision) = env::var("BOTEVAL_REVISION") {
            config.store.revision = revision;
        }

        if let Ok(token) = env::var("BOTEVAL_TOKEN") {
            config.store.token = token;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotevalError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| BotevalError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(store) = file_config.store {
            if let Some(endpoint) = store.endpoint {
                config.store.endpoint = endpoint;
            }
            if let Some(repo_id) = store.repo_id {
                config.store.repo_id = repo_id;
            }
            if let Some(revision) = store.revision {
                config.store.revision = revision;
            }
            if let Some(token) = store.token {
                config.store.token = token;
            }
        }

        if let Some(paths) = file_config.paths {
            if let Some(questions) = paths.questions {
                config.paths.questions = questions;
            }
            if let Some(compare_dir) = paths.compare_dir {
                config.paths.compare_dir = compare_dir;
            }
            if let Some(gather_dir) = paths.gather_dir {
                config.paths.gather_dir = gather_dir;
            }
            if let Some(annotate_dir) = paths.annotate_dir {
                config.paths.annotate_dir = annotate_dir;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "boteval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.store.endpoint.is_empty() {
            return Err(BotevalError::Config(
                "Store endpoint is required. Set BOTEVAL_ENDPOINT environment variable or add to config file.".to_string()
            ));
        }

        if self.store.repo_id.is_empty() {
            return Err(BotevalError::Config(
                "Repository id is required. Set BOTEVAL_REPO environment variable or add to config file.".to_string()
            ));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_store(endpoint: impl Into<String>, repo_id: impl Into<String>) -> Self {
        Self {
            store: StoreConfig {
                endpoint: endpoint.into(),
                repo_id: repo_id.into(),
                ..Default::default()
            },
            paths: PathsConfig::default(),
        }
    }
}
