use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, SessionConfig};

/// Reads an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::Invalid(format!("Invalid {name} value '{raw}': {e}")))
        })
        .transpose()
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    env_var(name)
        .map(|raw| {
            parse_bool(&raw)
                .ok_or_else(|| ConfigError::Invalid(format!("Invalid {name} value '{raw}'")))
        })
        .transpose()
}

/// Builds a configuration from defaults overridden by environment variables.
pub(super) fn load_env_config() -> Result<SessionConfig, ConfigError> {
    let mut config = SessionConfig::default();

    if let Some(engine) = env_var("TTS_ENGINE") {
        config.tts.engine = engine;
    }
    if let Some(dir) = env_var("REFERENCES_DIR") {
        config.tts.references_dir = PathBuf::from(dir);
    }
    if let Some(rate) = parse_env::<u32>("TTS_SAMPLE_RATE")? {
        config.tts.sample_rate = rate;
    }
    if let Some(path) = env_var("TTS_OUTPUT_PATH") {
        config.tts.output_path = Some(PathBuf::from(path));
    }

    if let Some(provider) = env_var("LLM_PROVIDER") {
        config.llm.provider = provider;
    }
    if let Some(tokens) = parse_env::<usize>("LLM_MAX_HISTORY_TOKENS")? {
        config.llm.max_history_tokens = tokens;
    }
    if let Some(path) = env_var("LLM_PAYLOAD_PATH") {
        config.llm.payload_path = Some(PathBuf::from(path));
    }

    if let Some(debug) = parse_env_bool("DEBUG")? {
        config.display.debug = debug;
    }

    Ok(config)
}
