//! Streaming sentence segmentation.
//!
//! ```text
//!  TokenRouter ──set_emotion / append_text / finish_current──▶ SentenceQueue
//!                                                               │
//!                                   ┌───────────────────────────┤
//!                                   ▼                           ▼
//!                          current (open) sentence      finished backlog (FIFO)
//!                                   │                           │
//!                                   └────────── pop_next ───────┘
//!                                                │
//!                                                ▼
//!                                      PlaybackCoordinator
//! ```
//!
//! # Example
//!
//! ```rust
//! use waav_voice_chat::core::sentence::SentenceQueue;
//!
//! let queue = SentenceQueue::new();
//! queue.set_emotion("happy");
//! queue.append_text("Hello, ");
//! queue.append_text("world!");
//! queue.finish_current();
//!
//! let sentence = queue.pop_next().unwrap();
//! assert_eq!(sentence.text(), "Hello, world!");
//! assert_eq!(sentence.emotion(), Some("happy"));
//! assert!(sentence.is_finished());
//! ```

mod queue;
mod types;

pub use queue::SentenceQueue;
pub use types::{Sentence, SentenceSnapshot};
