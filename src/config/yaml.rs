use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// tts:
///   engine: "simulated"
///   references_dir: "reference_wavs"
///   sample_rate: 24000
///   channels: 1
///   output_path: "session.wav"
///   poll_interval_ms: 10
///   idle_interval_ms: 10
///   completion_settle_ms: 500
///
/// llm:
///   provider: "scripted"
///   max_history_tokens: 1548
///   payload_path: "payload.txt"
///   token_delay_ms: 15
///   script:
///     - "[happy] Hello there! [calm] How can I help?"
///
/// chat:
///   char: "Aria"
///   user: "Sam"
///   char_description: "{char} is a warm, curious companion."
///   user_description: "{user} is chatting after work."
///   scenario: "{char} and {user} talk in the evening."
///   system_prompt: "You are {char}. ... Use {valid_emotions_str}."
///
/// display:
///   print_emotions: true
///   print_llm_text: true
///   debug: false
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub tts: Option<TtsYaml>,
    pub llm: Option<LlmYaml>,
    pub chat: Option<ChatYaml>,
    pub display: Option<DisplayYaml>,
}

/// Synthesis and playback configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    /// Synthesis engine: "simulated"
    pub engine: Option<String>,
    /// Directory holding one `<emotion>.wav` per emotion
    pub references_dir: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// WAV file receiving all played audio
    pub output_path: Option<String>,
    /// Growth/drain polling interval of the sentence worker (ms)
    pub poll_interval_ms: Option<u64>,
    /// Pause between sentence queue pops (ms)
    pub idle_interval_ms: Option<u64>,
    /// Continuous idle time before a turn's audio counts as complete (ms)
    pub completion_settle_ms: Option<u64>,
}

/// Language model configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmYaml {
    pub provider: Option<String>,
    /// Canned replies of the scripted backend, used in order
    pub script: Option<Vec<String>>,
    pub max_history_tokens: Option<usize>,
    pub payload_path: Option<String>,
    /// Delay between streamed tokens of the scripted backend (ms)
    pub token_delay_ms: Option<u64>,
}

/// Character and prompt templates from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChatYaml {
    pub char: Option<String>,
    pub user: Option<String>,
    pub char_description: Option<String>,
    pub user_description: Option<String>,
    pub scenario: Option<String>,
    pub system_prompt: Option<String>,
}

/// Console output switches from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DisplayYaml {
    pub print_emotions: Option<bool>,
    pub print_llm_text: Option<bool>,
    pub debug: Option<bool>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Read(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML config: {e}")))?;

        Ok(config)
    }
}
