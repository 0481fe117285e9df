mod base;
mod conversation;
mod scripted;

use std::time::Duration;

pub use base::{BoxedLanguageModel, LanguageModel, LlmError, LlmResult, TokenCallback};
pub use conversation::{
    Conversation, Message, Role, TokenCounter, TokenUsage, whitespace_token_count,
};
pub use scripted::ScriptedModel;

use crate::config::LlmConfig;

/// Providers that stream from a network service.
const NETWORK_PROVIDERS: &[&str] = &["anthropic", "openai", "ollama", "llamacpp", "lmstudio"];

/// Factory function to create a language model backend.
///
/// # Supported Providers
///
/// - `"scripted"` - replays canned replies from configuration
///
/// Network providers (`anthropic`, `openai`, `ollama`, `llamacpp`,
/// `lmstudio`) are recognized but not available in this build.
pub fn create_language_model(config: &LlmConfig) -> LlmResult<BoxedLanguageModel> {
    let provider = config.provider.to_lowercase();
    match provider.as_str() {
        "scripted" => {
            let mut model = ScriptedModel::new(config.script.clone(), config.max_history_tokens)
                .with_token_delay(Duration::from_millis(config.token_delay_ms));
            if let Some(path) = &config.payload_path {
                model = model.with_payload_path(path);
            }
            Ok(Box::new(model))
        }
        p if NETWORK_PROVIDERS.contains(&p) => Err(LlmError::Unavailable(provider)),
        _ => Err(LlmError::InvalidConfiguration(format!(
            "Unsupported LLM provider: {}. Supported providers: scripted",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_scripted_model() {
        let config = LlmConfig::default();
        let model = create_language_model(&config).unwrap();
        assert_eq!(model.name(), "scripted");
    }

    #[test]
    fn test_provider_case_insensitive() {
        let config = LlmConfig {
            provider: "Scripted".to_string(),
            ..Default::default()
        };
        assert!(create_language_model(&config).is_ok());
    }

    #[test]
    fn test_network_provider_unavailable() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_language_model(&config),
            Err(LlmError::Unavailable(_))
        ));
    }

    #[test]
    fn test_unknown_provider() {
        let config = LlmConfig {
            provider: "invalid".to_string(),
            ..Default::default()
        };
        match create_language_model(&config) {
            Err(LlmError::InvalidConfiguration(msg)) => assert!(msg.contains("scripted")),
            Err(other) => panic!("Expected InvalidConfiguration error, got: {other:?}"),
            Ok(_) => panic!("Expected error for invalid provider"),
        }
    }
}
