//! Configuration management for sotto.
//!
//! Loads configuration from ${SOTTO_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths;

/// Default config template with comments, embedded at compile time.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("default_config.toml");

/// Default answer-voice instructions when none are configured.
const DEFAULT_INSTRUCTIONS: &str = "You are a seasoned professional answering interview \
questions aloud. Answer directly and concisely in the first person, lead with the practical \
steps, commands, or tools you would actually use, and keep the tone confident and \
conversational. Prefer one tight paragraph over lists; the answer must be easy to deliver \
verbally.";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion model to use
    pub model: String,

    /// Maximum tokens per answer
    pub max_output_tokens: u32,

    /// Optional inline instructions
    pub instructions: Option<String>,

    /// Optional path to a file containing the instructions
    pub instructions_file: Option<String>,

    /// Plain-text context documents folded into every prompt
    pub context_files: Vec<String>,

    /// Transcripts shorter than this never start a turn
    pub min_question_chars: usize,

    /// Committed turns remembered for prompt enrichment
    pub history_max_turns: usize,

    /// Display log bound in lines
    pub display_max_lines: usize,

    /// Display consumer poll cadence in milliseconds
    pub poll_interval_ms: u64,

    /// Events applied per consumer tick
    pub consumer_batch_size: usize,

    /// Bounded wait for a superseded worker's exit, in milliseconds
    pub worker_join_timeout_ms: u64,

    /// Optional completion endpoint override (for test rigs or proxies)
    pub openai_base_url: Option<String>,
}

impl Config {
    const DEFAULT_MODEL: &str = "gpt-5.1";
    const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 400;
    const DEFAULT_MIN_QUESTION_CHARS: usize = 20;
    const DEFAULT_HISTORY_MAX_TURNS: usize = 8;
    const DEFAULT_DISPLAY_MAX_LINES: usize = 500;
    const DEFAULT_POLL_INTERVAL_MS: u64 = 20;
    const DEFAULT_CONSUMER_BATCH_SIZE: usize = 64;
    const DEFAULT_WORKER_JOIN_TIMEOUT_MS: u64 = 250;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file with the default template if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            DEFAULT_CONFIG_TEMPLATE.to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["model"] = value(model);

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the effective instructions, preferring the file if both are set.
    pub fn effective_instructions(&self) -> Result<String> {
        if let Some(path_str) = &self.instructions_file {
            let content = fs::read_to_string(Path::new(path_str))
                .with_context(|| format!("Failed to read instructions file: {path_str}"))?;
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }

        let inline = self.instructions.as_deref().unwrap_or("").trim();
        if inline.is_empty() {
            Ok(DEFAULT_INSTRUCTIONS.to_string())
        } else {
            Ok(inline.to_string())
        }
    }

    /// Returns the effective completion base URL from config, if set.
    /// Empty strings are treated as unset.
    pub fn effective_openai_base_url(&self) -> Option<&str> {
        self.openai_base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn worker_join_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_join_timeout_ms)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            max_output_tokens: Self::DEFAULT_MAX_OUTPUT_TOKENS,
            instructions: None,
            instructions_file: None,
            context_files: Vec::new(),
            min_question_chars: Self::DEFAULT_MIN_QUESTION_CHARS,
            history_max_turns: Self::DEFAULT_HISTORY_MAX_TURNS,
            display_max_lines: Self::DEFAULT_DISPLAY_MAX_LINES,
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            consumer_batch_size: Self::DEFAULT_CONSUMER_BATCH_SIZE,
            worker_join_timeout_ms: Self::DEFAULT_WORKER_JOIN_TIMEOUT_MS,
            openai_base_url: None,
        }
    }
}
