//! Conversation history bounded by a token budget.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => f.write_str("system"),
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Counts tokens in a piece of text.
pub type TokenCounter = fn(&str) -> usize;

/// Whitespace-separated word count.
pub fn whitespace_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Token accounting of one truncation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub system_tokens: usize,
    pub history_tokens: usize,
    pub max_tokens: usize,
    pub removed_messages: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.system_tokens + self.history_tokens
    }

    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.total())
    }

    pub fn fill_percentage(&self) -> f64 {
        if self.max_tokens == 0 {
            return 100.0;
        }
        self.total() as f64 / self.max_tokens as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    history: Vec<Message>,
    max_tokens: usize,
    counter: TokenCounter,
}

impl Conversation {
    pub fn new(max_tokens: usize) -> Self {
        Self::with_counter(max_tokens, whitespace_token_count)
    }

    pub fn with_counter(max_tokens: usize, counter: TokenCounter) -> Self {
        Self {
            history: Vec::new(),
            max_tokens,
            counter,
        }
    }

    pub fn add_user_message(&mut self, text: &str) {
        self.history.push(Message::new(Role::User, text));
    }

    pub fn add_assistant_message(&mut self, text: &str) {
        self.history.push(Message::new(Role::Assistant, text));
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Keeps the newest messages that fit the budget together with
    /// `system_prompt`; older messages are dropped permanently.
    ///
    /// Truncation stops at the first message (walking backwards) that does
    /// not fit, so the kept history is always a contiguous suffix.
    pub fn truncate(&mut self, system_prompt: &str) -> TokenUsage {
        let system_tokens = (self.counter)(system_prompt);
        let mut total = system_tokens;
        let mut keep_from = self.history.len();

        for (index, message) in self.history.iter().enumerate().rev() {
            let tokens = (self.counter)(&message.content);
            if total + tokens > self.max_tokens {
                break;
            }
            total += tokens;
            keep_from = index;
        }

        let removed_messages = keep_from;
        self.history.drain(..keep_from);

        let usage = TokenUsage {
            system_tokens,
            history_tokens: total - system_tokens,
            max_tokens: self.max_tokens,
            removed_messages,
        };
        debug!(
            total = usage.total(),
            max = usage.max_tokens,
            system = usage.system_tokens,
            history = usage.history_tokens,
            remaining = usage.remaining(),
            removed = usage.removed_messages,
            "Token usage: {:.2}%",
            usage.fill_percentage()
        );
        usage
    }

    /// System prompt followed by the (already truncated) history.
    pub fn messages(&self, system_prompt: &str) -> Vec<Message> {
        std::iter::once(Message::new(Role::System, system_prompt))
            .chain(self.history.iter().cloned())
            .collect()
    }
}
