use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Invalid LLM configuration: {0}")]
    InvalidConfiguration(String),

    #[error("LLM provider '{0}' is not available in this build")]
    Unavailable(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("No request payload recorded yet")]
    NoPayload,

    #[error("Failed to write payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Callback receiving each generated token as it streams in.
pub type TokenCallback<'a> = &'a mut (dyn FnMut(&str) + Send);

/// A chat language model backend.
///
/// The backend owns the conversation history. A response is streamed token
/// by token into `on_token`; the caller records the assembled reply with
/// [`add_assistant_text`](LanguageModel::add_assistant_text) afterwards.
#[async_trait]
pub trait LanguageModel: Send {
    fn name(&self) -> &str;

    fn add_user_text(&mut self, text: &str);

    fn add_assistant_text(&mut self, text: &str);

    /// Generates a reply to the current history.
    async fn generate_response(
        &mut self,
        system_prompt: &str,
        on_token: TokenCallback<'_>,
    ) -> LlmResult<()>;

    /// Writes the last request payload to the configured location. A no-op
    /// when no location is configured.
    fn write_payload(&self) -> LlmResult<()>;
}

pub type BoxedLanguageModel = Box<dyn LanguageModel>;
