//! Configuration types for the juris system.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::traits::SegmentConfig;

/// Main configuration for the juris system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Segmentation configuration.
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Retrieval configuration.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Completion backend configuration.
    #[serde(default)]
    pub completion: CompletionConfig,
}

impl Default for JurisConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            segmentation: SegmentationConfig::default(),
            retrieval: RetrievalConfig::default(),
            completion: CompletionConfig::default(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    pub path: PathBuf,

    /// Enable WAL mode (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// SQLite cache size in KB (negative = KB, positive = pages).
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            wal_mode: true,
            cache_size: -64000, // 64MB
            busy_timeout_ms: 30000,
        }
    }
}

/// Segmentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Nominal chunk size in characters.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Overlap carried between consecutive chunks, in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    /// Minimum fragment length; shorter fragments are discarded.
    #[serde(default = "default_min_fragment_chars")]
    pub min_fragment_chars: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1200,
            overlap_chars: 150,
            min_fragment_chars: 50,
        }
    }
}

impl SegmentationConfig {
    /// The per-call segmentation parameters.
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            chunk_chars: self.chunk_chars,
            overlap_chars: self.overlap_chars,
            min_fragment_chars: self.min_fragment_chars,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages returned by ranked search or the unranked fallback.
    #[serde(default = "default_passage_limit")]
    pub passage_limit: usize,

    /// Cap on passages assembled for whole-matter tools.
    #[serde(default = "default_matter_passage_cap")]
    pub matter_passage_cap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            passage_limit: 25,
            matter_passage_cap: 200,
        }
    }
}

/// Completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum tokens to generate per completion.
    #[serde(default = "default_max_completion_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds. Sized for whole-matter prompts.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// API key. Falls back to the ANTHROPIC_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_completion_tokens(),
            request_timeout_secs: default_request_timeout(),
            api_key: None,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_cache_size() -> i32 {
    -64000
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_chunk_chars() -> usize {
    1200
}

fn default_overlap_chars() -> usize {
    150
}

fn default_min_fragment_chars() -> usize {
    50
}

fn default_passage_limit() -> usize {
    25
}

fn default_matter_passage_cap() -> usize {
    200
}

fn default_model() -> String {
    "claude-opus-4-5".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_completion_tokens() -> u32 {
    8192
}

fn default_request_timeout() -> u64 {
    300
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("juris")
        .join("juris.db")
}

impl JurisConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::JurisError::Config {
                message: format!("Failed to parse config: {}", e),
            }
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("juris").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("juris.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        // Return defaults
        Ok(Self::default())
    }
}
