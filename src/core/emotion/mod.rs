//! Emotion labels and the per-emotion voice reference set.
//!
//! Emotions are named by the reference files in a directory
//! (`reference_wavs/happy.wav` defines `happy`). `neutral` is the fallback
//! for anything unknown and must always be present.
//!
//! # Example
//!
//! ```rust,no_run
//! use waav_voice_chat::core::emotion::EmotionReferences;
//!
//! let references = EmotionReferences::load("reference_wavs")?;
//! let resolved = references.resolve(Some("happy"));
//! println!("voice: {:?}", resolved.path());
//! # Ok::<(), waav_voice_chat::core::emotion::ReferenceError>(())
//! ```

mod label;
mod references;

pub use label::{EmotionLabel, NEUTRAL};
pub use references::{EmotionReferences, ReferenceError, ReferenceResult, ResolvedReference};
