use super::{ConfigError, SessionConfig};

/// Rejects values the playback pipeline cannot run with.
pub(super) fn validate_config(config: &SessionConfig) -> Result<(), ConfigError> {
    let tts = &config.tts;
    if tts.sample_rate == 0 {
        return Err(ConfigError::Invalid(
            "tts.sample_rate must be greater than 0".to_string(),
        ));
    }
    if tts.channels == 0 {
        return Err(ConfigError::Invalid(
            "tts.channels must be greater than 0".to_string(),
        ));
    }
    if tts.poll_interval_ms == 0 || tts.idle_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "tts polling intervals must be greater than 0 ms".to_string(),
        ));
    }
    if tts.completion_settle_ms == 0 {
        return Err(ConfigError::Invalid(
            "tts.completion_settle_ms must be greater than 0".to_string(),
        ));
    }
    if config.llm.max_history_tokens == 0 {
        return Err(ConfigError::Invalid(
            "llm.max_history_tokens must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
