//! Bridge from a growing sentence to a lazily produced text stream.
//!
//! The sentence worker pushes each newly observed suffix of an open sentence
//! into the bridge; the synthesis engine consumes the bridge's stream. The
//! stream suspends while nothing is pending and ends only after `stop()` was
//! called and every pushed increment has been yielded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

#[derive(Debug, Default)]
struct BridgeState {
    pending: VecDeque<String>,
    stopped: bool,
}

#[derive(Debug, Default)]
struct BridgeInner {
    state: Mutex<BridgeState>,
    notify: Notify,
    produced: AtomicBool,
}

enum Step {
    Item(String),
    Wait,
    Done,
}

/// Single-producer, single-consumer text increment channel for one sentence.
///
/// Cloning yields another handle to the same bridge.
#[derive(Debug, Clone, Default)]
pub struct IncrementalTextBridge {
    inner: Arc<BridgeInner>,
}

impl IncrementalTextBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an increment and wakes the consumer.
    ///
    /// Empty increments and pushes after `stop()` are ignored.
    pub fn push_increment(&self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if state.stopped {
                warn!("Dropping increment pushed after bridge stop");
                return;
            }
            state.pending.push_back(text);
        }
        self.inner.notify.notify_one();
    }

    /// Signals that no further increments will arrive. Idempotent.
    pub fn stop(&self) {
        self.inner.state.lock().stopped = true;
        self.inner.notify.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn is_stopped(&self) -> bool {
        self.inner.state.lock().stopped
    }

    /// Number of increments pushed but not yet yielded.
    pub(crate) fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Returns the lazy increment sequence.
    ///
    /// A bridge has one consumer. Later calls return an empty sequence.
    pub fn produce(&self) -> BoxStream<'static, String> {
        if self.inner.produced.swap(true, Ordering::AcqRel) {
            warn!("Bridge stream already taken");
            return stream::empty().boxed();
        }

        let inner = self.inner.clone();
        async_stream::stream! {
            loop {
                let step = {
                    let mut state = inner.state.lock();
                    match state.pending.pop_front() {
                        Some(text) => Step::Item(text),
                        None if state.stopped => Step::Done,
                        None => Step::Wait,
                    }
                };
                match step {
                    Step::Item(text) => yield text,
                    Step::Done => break,
                    Step::Wait => inner.notify.notified().await,
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_yields_increments_in_order() {
        let bridge = IncrementalTextBridge::new();
        bridge.push_increment("Hello");
        bridge.push_increment(", ");
        bridge.push_increment("world");
        bridge.stop();

        let collected: Vec<String> = bridge.produce().collect().await;
        assert_eq!(collected, vec!["Hello", ", ", "world"]);
    }

    #[tokio::test]
    async fn test_waits_for_increments() {
        let bridge = IncrementalTextBridge::new();
        let mut stream = bridge.produce();

        let pending = timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err(), "stream must suspend while empty");

        let producer = bridge.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push_increment("late");
            producer.stop();
        });

        assert_eq!(stream.next().await.as_deref(), Some("late"));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_drains_before_end() {
        let bridge = IncrementalTextBridge::new();
        let mut stream = bridge.produce();

        let producer = bridge.clone();
        let handle = tokio::spawn(async move {
            for i in 0..100 {
                producer.push_increment(format!("{i} "));
                if i % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            producer.stop();
        });

        let mut received = Vec::new();
        while let Some(text) = stream.next().await {
            received.push(text);
        }
        handle.await.unwrap();

        let expected: Vec<String> = (0..100).map(|i| format!("{i} ")).collect();
        assert_eq!(received, expected);
        assert_eq!(bridge.pending(), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let bridge = IncrementalTextBridge::new();
        bridge.stop();
        bridge.stop();
        assert!(bridge.is_stopped());

        bridge.push_increment("ignored");
        let collected: Vec<String> = bridge.produce().collect().await;
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_second_consumer_gets_empty_stream() {
        let bridge = IncrementalTextBridge::new();
        bridge.push_increment("only once");
        bridge.stop();

        let first: Vec<String> = bridge.produce().collect().await;
        let second: Vec<String> = bridge.produce().collect().await;
        assert_eq!(first, vec!["only once"]);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_empty_increment_ignored() {
        let bridge = IncrementalTextBridge::new();
        bridge.push_increment("");
        assert_eq!(bridge.pending(), 0);
    }
}
