//! Token router: the producer side of the sentence queue.
//!
//! The router consumes raw LLM tokens, strips inline `[emotion]` markers and
//! forwards emotion changes and normalized plain text to a
//! [`SentenceQueue`]. Plain text is forwarded at the end of every token
//! rather than at the end of the reply, so playback can follow the stream.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waav_voice_chat::core::router::TokenRouter;
//! use waav_voice_chat::core::sentence::SentenceQueue;
//!
//! let queue = Arc::new(SentenceQueue::new());
//! let mut router = TokenRouter::new(queue.clone());
//! router.push_token("[Hap");
//! router.push_token("py] Hello\nthere!");
//! router.finish();
//!
//! let sentence = queue.pop_next().unwrap();
//! assert_eq!(sentence.emotion(), Some("happy"));
//! assert_eq!(sentence.text(), "Hello there!");
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::trace;

use crate::core::emotion::EmotionLabel;
use crate::core::sentence::SentenceQueue;

const MARKER_OPEN: char = '[';
const MARKER_CLOSE: char = ']';

/// What the router forwarded to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    Emotion(EmotionLabel),
    Text(String),
}

/// Collapses whitespace across the whole reply: line breaks are removed,
/// leading whitespace is dropped, and whitespace runs become one space.
#[derive(Debug, Default)]
struct WhitespaceNormalizer {
    started: bool,
    after_space: bool,
}

impl WhitespaceNormalizer {
    fn normalize(&mut self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c == '\n' {
                continue;
            }
            if c.is_whitespace() {
                if self.started && !self.after_space {
                    out.push(' ');
                    self.after_space = true;
                }
            } else {
                out.push(c);
                self.started = true;
                self.after_space = false;
            }
        }
        out
    }
}

/// Splits one assistant reply into emotion changes and plain text.
///
/// A router lives for one turn; the queue it feeds is shared with the
/// playback workers.
pub struct TokenRouter {
    queue: Arc<SentenceQueue>,
    valid_emotions: Option<BTreeSet<EmotionLabel>>,
    /// Plain text seen since the last flush.
    plain: String,
    /// Label collected since an unclosed `[`.
    marker: Option<String>,
    swallow_space: bool,
    normalizer: WhitespaceNormalizer,
    transcript: String,
    events: Vec<RouterEvent>,
}

impl TokenRouter {
    pub fn new(queue: Arc<SentenceQueue>) -> Self {
        Self {
            queue,
            valid_emotions: None,
            plain: String::new(),
            marker: None,
            swallow_space: false,
            normalizer: WhitespaceNormalizer::default(),
            transcript: String::new(),
            events: Vec::new(),
        }
    }

    /// Restricts emotions to `emotions`; any other label becomes `neutral`.
    pub fn with_valid_emotions<'a>(
        mut self,
        emotions: impl IntoIterator<Item = &'a EmotionLabel>,
    ) -> Self {
        self.valid_emotions = Some(emotions.into_iter().cloned().collect());
        self
    }

    /// Routes one token and returns what was forwarded because of it.
    pub fn push_token(&mut self, token: &str) -> Vec<RouterEvent> {
        for c in token.chars() {
            self.push_char(c);
        }
        self.flush_plain();
        std::mem::take(&mut self.events)
    }

    /// Ends the reply: flushes leftover text, including an unclosed marker
    /// as literal text, and closes the open sentence.
    pub fn finish(&mut self) -> Vec<RouterEvent> {
        if let Some(label) = self.marker.take() {
            self.plain.push(MARKER_OPEN);
            self.plain.push_str(&label);
        }
        self.flush_plain();
        self.queue.finish_current();
        std::mem::take(&mut self.events)
    }

    /// Every character received so far, markers included.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn into_transcript(self) -> String {
        self.transcript
    }

    fn push_char(&mut self, c: char) {
        self.transcript.push(c);

        if std::mem::take(&mut self.swallow_space) && c == ' ' {
            return;
        }

        let Some(label) = self.marker.as_mut() else {
            if c == MARKER_OPEN {
                self.flush_plain();
                self.marker = Some(String::new());
            } else {
                self.plain.push(c);
            }
            return;
        };

        match c {
            MARKER_CLOSE => {
                let label = std::mem::take(label);
                self.marker = None;
                self.emit_emotion(&label);
                self.swallow_space = true;
            }
            MARKER_OPEN => {
                // An unclosed marker followed by another `[` is literal text.
                let abandoned = std::mem::take(label);
                self.plain.push(MARKER_OPEN);
                self.plain.push_str(&abandoned);
                self.flush_plain();
            }
            _ => label.push(c),
        }
    }

    fn emit_emotion(&mut self, raw: &str) {
        let mut emotion = EmotionLabel::new(raw);
        if let Some(valid) = &self.valid_emotions {
            if !valid.contains(&emotion) {
                trace!(label = raw, "Unknown emotion label, using neutral");
                emotion = EmotionLabel::neutral();
            }
        }
        self.queue.set_emotion(emotion.as_str());
        self.events.push(RouterEvent::Emotion(emotion));
    }

    fn flush_plain(&mut self) {
        if self.plain.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.plain);
        let text = self.normalizer.normalize(&raw);
        if text.is_empty() {
            return;
        }
        self.queue.append_text(&text);
        self.events.push(RouterEvent::Text(text));
    }
}
