//! The `Sentence` unit shared between the token producer and the TTS worker.
//!
//! A sentence is written by exactly one producer (through the
//! [`SentenceQueue`](super::SentenceQueue)) and may be read by the sentence
//! worker while it is still growing. Every access goes through a per-sentence
//! mutex; readers receive owned snapshots, never a reference into the buffer.

use std::fmt;

use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Mutable part of a sentence, guarded by the sentence's own lock.
#[derive(Debug, Default)]
struct SentenceState {
    text: String,
    finished: bool,
    retrieved: bool,
    popped: bool,
}

/// A consistent view of a sentence's text and completion flag.
///
/// Both fields are read under the same lock acquisition, so a snapshot with
/// `finished == true` always carries the sentence's complete text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSnapshot {
    pub text: String,
    pub finished: bool,
}

/// A growable unit of text tagged with at most one emotion.
///
/// # Invariants
///
/// - Text is append-only and never shrinks.
/// - The emotion is fixed at construction.
/// - `finished` moves from `false` to `true` once and never back.
pub struct Sentence {
    id: Uuid,
    emotion: Option<String>,
    state: Mutex<SentenceState>,
}

impl Sentence {
    /// Creates an empty, open sentence.
    pub fn new(emotion: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            emotion,
            state: Mutex::new(SentenceState::default()),
        }
    }

    /// Unique identifier of this sentence.
    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Emotion label this sentence was opened with, if any.
    #[inline]
    pub fn emotion(&self) -> Option<&str> {
        self.emotion.as_deref()
    }

    /// Appends `text` to the accumulated text.
    ///
    /// Appends after the sentence finished are dropped.
    pub fn append(&self, text: &str) {
        let mut state = self.state.lock();
        if state.finished {
            warn!(sentence_id = %self.id, "Dropping append to finished sentence");
            return;
        }
        state.text.push_str(text);
    }

    /// Returns a copy of the text accumulated so far.
    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    /// Returns text and completion state read atomically together.
    pub fn snapshot(&self) -> SentenceSnapshot {
        let state = self.state.lock();
        SentenceSnapshot {
            text: state.text.clone(),
            finished: state.finished,
        }
    }

    /// Length of the accumulated text in bytes.
    pub fn len(&self) -> usize {
        self.state.lock().text.len()
    }

    /// Whether no text has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.state.lock().text.is_empty()
    }

    /// Marks the sentence finished. Idempotent.
    pub fn mark_finished(&self) {
        self.state.lock().finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// Whether a consumer took this sentence while it was still open.
    pub fn is_retrieved(&self) -> bool {
        self.state.lock().retrieved
    }

    /// Whether this sentence was dequeued from the finished backlog.
    pub fn is_popped(&self) -> bool {
        self.state.lock().popped
    }

    pub(crate) fn mark_retrieved(&self) {
        self.state.lock().retrieved = true;
    }

    pub(crate) fn mark_popped(&self) {
        self.state.lock().popped = true;
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "Sentence(text='{}', emotion='{}', is_finished={})",
            state.text,
            self.emotion.as_deref().unwrap_or("None"),
            state.finished
        )
    }
}

impl fmt::Debug for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Sentence")
            .field("id", &self.id)
            .field("emotion", &self.emotion)
            .field("text", &state.text)
            .field("finished", &state.finished)
            .field("retrieved", &state.retrieved)
            .field("popped", &state.popped)
            .finish()
    }
}
