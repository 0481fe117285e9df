//! Queue arbitrating producer writes against consumer pops.
//!
//! The queue owns at most one open ("current") sentence plus a FIFO backlog
//! of finished sentences. A single queue-level mutex orders every operation,
//! so producer calls (`set_emotion`, `append_text`, `finish_current`) and
//! consumer calls (`pop_next`) are observed in lock-acquisition order.
//!
//! A sentence reaches the consumer exactly once: either from the backlog after
//! it finished, or as the open sentence (flagged `retrieved`) while it is
//! still growing. A retrieved sentence is never added to the backlog later.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::types::Sentence;

#[derive(Debug, Default)]
struct QueueState {
    backlog: VecDeque<Arc<Sentence>>,
    current: Option<Arc<Sentence>>,
}

impl QueueState {
    /// Closes `sentence` and enqueues it unless a consumer already holds it.
    fn close(&mut self, sentence: Arc<Sentence>) {
        sentence.mark_finished();
        if !sentence.is_retrieved() {
            self.backlog.push_back(sentence);
        }
    }
}

/// Thread-safe queue of emotion-tagged sentences for one assistant turn.
#[derive(Debug, Default)]
pub struct SentenceQueue {
    state: Mutex<QueueState>,
}

impl SentenceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new sentence tagged with `emotion`.
    ///
    /// A current sentence holding text is closed first. A current sentence
    /// with no text is discarded without reaching the backlog; it is still
    /// marked finished so a consumer that already retrieved it can move on.
    pub fn set_emotion(&self, emotion: &str) {
        let mut state = self.state.lock();
        if let Some(current) = state.current.take() {
            if current.is_empty() {
                trace!(sentence_id = %current.id(), "Discarding empty sentence");
                current.mark_finished();
            } else {
                state.close(current);
            }
        }
        state.current = Some(Arc::new(Sentence::new(Some(emotion.to_string()))));
    }

    /// Appends text to the current sentence, opening one if needed.
    ///
    /// Whitespace-only text is ignored while there is no current sentence or
    /// the current sentence is still empty.
    pub fn append_text(&self, text: &str) {
        let mut state = self.state.lock();
        if text.trim().is_empty() {
            match &state.current {
                None => return,
                Some(current) if current.is_empty() => return,
                Some(_) => {}
            }
        }

        let current = state
            .current
            .get_or_insert_with(|| Arc::new(Sentence::new(None)));
        current.append(text);
    }

    /// Closes the current sentence, if any.
    pub fn finish_current(&self) {
        let mut state = self.state.lock();
        if let Some(current) = state.current.take() {
            if !current.is_finished() {
                state.close(current);
            }
        }
    }

    /// Returns the next sentence to play.
    ///
    /// The backlog head is removed and flagged `popped`. With an empty backlog
    /// the open sentence is flagged `retrieved` and returned while it stays in
    /// the current slot, so the caller can follow it as it grows.
    pub fn pop_next(&self) -> Option<Arc<Sentence>> {
        let mut state = self.state.lock();
        if let Some(sentence) = state.backlog.pop_front() {
            sentence.mark_popped();
            return Some(sentence);
        }
        state.current.as_ref().map(|current| {
            current.mark_retrieved();
            current.clone()
        })
    }

    /// True when the finished backlog is empty. The open sentence is not
    /// counted.
    pub fn is_empty(&self) -> bool {
        self.state.lock().backlog.is_empty()
    }

    /// Number of finished sentences waiting in the backlog.
    pub fn len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    /// Whether a sentence is currently open for writing.
    pub fn has_open_sentence(&self) -> bool {
        self.state.lock().current.is_some()
    }
}
