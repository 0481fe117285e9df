//! Configuration module for the voice chat session
//!
//! This module handles session configuration from .env files, YAML files
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_voice_chat::config::SessionConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = SessionConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = SessionConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("References in {}", config.tts.references_dir.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::tts::{AudioFormat, PlaybackSettings};

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::{ChatYaml, DisplayYaml, LlmYaml, TtsYaml, YamlConfig};

/// Errors raised while loading configuration. Fatal at session start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Read(String),

    #[error("{0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Synthesis and playback settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsConfig {
    pub engine: String,
    pub references_dir: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    /// Absent means audio is discarded.
    pub output_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub idle_interval_ms: u64,
    pub completion_settle_ms: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: "simulated".to_string(),
            references_dir: PathBuf::from("reference_wavs"),
            sample_rate: 24_000,
            channels: 1,
            output_path: None,
            poll_interval_ms: 10,
            idle_interval_ms: 10,
            completion_settle_ms: 500,
        }
    }
}

impl TtsConfig {
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels)
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
        }
    }

    pub fn completion_settle(&self) -> Duration {
        Duration::from_millis(self.completion_settle_ms)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}

/// Language model backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: String,
    pub script: Vec<String>,
    pub max_history_tokens: usize,
    pub payload_path: Option<PathBuf>,
    pub token_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "scripted".to_string(),
            script: Vec::new(),
            max_history_tokens: 1548,
            payload_path: None,
            token_delay_ms: 15,
        }
    }
}

/// Character parameters and prompt templates.
///
/// Templates use `{char}`, `{user}`, `{char_description}`,
/// `{user_description}`, `{scenario}` and `{valid_emotions_str}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub char: String,
    pub user: String,
    pub char_description: String,
    pub user_description: String,
    pub scenario: String,
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            char: "Aria".to_string(),
            user: "User".to_string(),
            char_description: "{char} is a warm, expressive companion who speaks in short sentences."
                .to_string(),
            user_description: "{user} is talking to {char} by voice.".to_string(),
            scenario: "{char} and {user} are having a relaxed conversation.".to_string(),
            system_prompt: "You are {char}. {char_description}\n{user_description}\n{scenario}\n\
                Start every sentence with exactly one emotion marker chosen from: \
                {valid_emotions_str}. Never use any other marker."
                .to_string(),
        }
    }
}

/// Console output switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub print_emotions: bool,
    pub print_llm_text: bool,
    pub debug: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            print_emotions: true,
            print_llm_text: true,
            debug: false,
        }
    }
}

/// Full session configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub tts: TtsConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub display: DisplayConfig,
}

impl SessionConfig {
    /// Load configuration from environment variables over defaults.
    ///
    /// The .env file is loaded in main.rs at application startup.
    pub fn from_env() -> ConfigResult<Self> {
        let config = env::load_env_config()?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let yaml_config = YamlConfig::from_file(path)?;
        let base = env::load_env_config()?;
        let config = merge::merge_config(base, Some(yaml_config));
        validation::validate_config(&config)?;
        Ok(config)
    }
}
