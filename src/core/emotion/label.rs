//! Emotion label normalization.
//!
//! Emotion labels arrive as free text inside `[label]` markers in the LLM
//! stream. They are compared case-insensitively and with surrounding
//! whitespace removed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label of the fallback emotion. A `neutral.wav` reference must exist.
pub const NEUTRAL: &str = "neutral";

/// Placeholder some producers emit for "no emotion".
const UNSET_PLACEHOLDER: &str = "none";

/// A normalized (trimmed, lowercase) emotion label.
///
/// # Example
///
/// ```rust
/// use waav_voice_chat::core::emotion::EmotionLabel;
///
/// let label = EmotionLabel::new("  Happy ");
/// assert_eq!(label.as_str(), "happy");
/// assert!(!label.is_unset());
/// assert!(EmotionLabel::new("None").is_unset());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionLabel(String);

impl EmotionLabel {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// The neutral fallback label.
    pub fn neutral() -> Self {
        Self(NEUTRAL.to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for an empty label or the literal `none` placeholder.
    pub fn is_unset(&self) -> bool {
        self.0.is_empty() || self.0 == UNSET_PLACEHOLDER
    }

    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.0 == NEUTRAL
    }
}

impl Default for EmotionLabel {
    fn default() -> Self {
        Self::neutral()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmotionLabel {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for EmotionLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
