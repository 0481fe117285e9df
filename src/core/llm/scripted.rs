//! Offline backend replaying canned replies.
//!
//! Replies are streamed in small fixed-size character pieces, so emotion
//! markers regularly straddle token boundaries the way they do with real
//! tokenizers.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::base::{LanguageModel, LlmError, LlmResult, TokenCallback};
use super::conversation::{Conversation, Message};

const MODEL_NAME: &str = "scripted";
const TOKEN_CHARS: usize = 4;

const DEFAULT_SCRIPT: &[&str] = &[
    "[happy] Hi there! It's really nice to hear from you. [neutral] What would you like to talk about?",
    "[neutral] That's an interesting thought. [happy] Tell me more about it!",
    "[sad] I'm sorry, I'm not sure I follow. [neutral] Could you say that another way?",
];

#[derive(Debug, Serialize)]
struct RequestPayload {
    model: &'static str,
    messages: Vec<Message>,
    stream: bool,
}

pub struct ScriptedModel {
    conversation: Conversation,
    script: Vec<String>,
    cursor: usize,
    token_delay: Duration,
    payload: Option<String>,
    payload_path: Option<PathBuf>,
}

impl ScriptedModel {
    pub fn new(script: Vec<String>, max_history_tokens: usize) -> Self {
        let script = if script.is_empty() {
            DEFAULT_SCRIPT.iter().map(|s| s.to_string()).collect()
        } else {
            script
        };
        Self {
            conversation: Conversation::new(max_history_tokens),
            script,
            cursor: 0,
            token_delay: Duration::ZERO,
            payload: None,
            payload_path: None,
        }
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn with_payload_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.payload_path = Some(path.into());
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Last request payload as pretty JSON.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    fn next_reply(&mut self) -> String {
        let reply = self.script[self.cursor % self.script.len()].clone();
        self.cursor += 1;
        reply
    }
}

/// Splits text into pieces of at most `size` characters.
fn tokenize(text: &str, size: usize) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (count, (index, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            tokens.push(&text[start..index]);
            start = index;
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn add_user_text(&mut self, text: &str) {
        self.conversation.add_user_message(text);
    }

    fn add_assistant_text(&mut self, text: &str) {
        self.conversation.add_assistant_message(text);
    }

    async fn generate_response(
        &mut self,
        system_prompt: &str,
        on_token: TokenCallback<'_>,
    ) -> LlmResult<()> {
        self.conversation.truncate(system_prompt);
        let payload = RequestPayload {
            model: MODEL_NAME,
            messages: self.conversation.messages(system_prompt),
            stream: true,
        };
        self.payload = Some(serde_json::to_string_pretty(&payload)?);

        let reply = self.next_reply();
        debug!(chars = reply.len(), "Streaming scripted reply");
        for token in tokenize(&reply, TOKEN_CHARS) {
            on_token(token);
            if self.token_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.token_delay).await;
            }
        }
        Ok(())
    }

    fn write_payload(&self) -> LlmResult<()> {
        let Some(path) = &self.payload_path else {
            return Ok(());
        };
        let payload = self.payload.as_deref().ok_or(LlmError::NoPayload)?;
        std::fs::write(path, payload)?;
        info!(path = %path.display(), "Wrote request payload");
        Ok(())
    }
}
