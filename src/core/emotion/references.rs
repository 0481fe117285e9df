//! Emotion reference set backed by a directory of `<emotion>.wav` files.
//!
//! The set is enumerated once when the session starts and is read-only
//! afterwards. Resolution at play time re-checks that the chosen file still
//! exists on disk and degrades to `neutral`, then to no reference at all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::label::{EmotionLabel, NEUTRAL};

const REFERENCE_EXTENSION: &str = "wav";

/// Errors raised while loading the reference directory. All of them are
/// fatal to session start.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Emotion reference directory not found: {0}")]
    DirectoryMissing(PathBuf),

    #[error("Fallback reference '{NEUTRAL}.wav' missing from {0}")]
    NeutralMissing(PathBuf),

    #[error("Failed to read reference directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Outcome of resolving a sentence's emotion to a voice reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedReference {
    /// The requested emotion's reference exists.
    Exact { emotion: EmotionLabel, path: PathBuf },
    /// The requested emotion was unknown, unset or its file vanished.
    Neutral { requested: EmotionLabel, path: PathBuf },
    /// Not even the neutral file exists; the engine keeps its current voice.
    Unavailable { requested: EmotionLabel },
}

impl ResolvedReference {
    /// Path to hand to the synthesis engine, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedReference::Exact { path, .. } | ResolvedReference::Neutral { path, .. } => {
                Some(path)
            }
            ResolvedReference::Unavailable { .. } => None,
        }
    }

    /// The emotion actually used for synthesis.
    pub fn effective_emotion(&self) -> EmotionLabel {
        match self {
            ResolvedReference::Exact { emotion, .. } => emotion.clone(),
            ResolvedReference::Neutral { .. } | ResolvedReference::Unavailable { .. } => {
                EmotionLabel::neutral()
            }
        }
    }
}

/// Fixed mapping from emotion label to its reference file.
#[derive(Debug, Clone)]
pub struct EmotionReferences {
    dir: PathBuf,
    entries: BTreeMap<EmotionLabel, PathBuf>,
}

impl EmotionReferences {
    /// Enumerates `dir` for `*.wav` files.
    ///
    /// # Errors
    ///
    /// Fails if the directory does not exist, cannot be read, or contains no
    /// `neutral.wav`.
    pub fn load(dir: impl AsRef<Path>) -> ReferenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ReferenceError::DirectoryMissing(dir));
        }

        let read_dir = std::fs::read_dir(&dir).map_err(|source| ReferenceError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut entries = BTreeMap::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| ReferenceError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_reference = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(REFERENCE_EXTENSION));
            if !is_reference || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                entries.insert(EmotionLabel::new(stem), path);
            }
        }

        if !entries.contains_key(&EmotionLabel::neutral()) {
            return Err(ReferenceError::NeutralMissing(dir));
        }

        debug!(
            "Loaded {} emotion references from {}",
            entries.len(),
            dir.display()
        );

        Ok(Self { dir, entries })
    }

    /// Directory the references were loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Valid emotion labels, sorted.
    pub fn emotions(&self) -> impl Iterator<Item = &EmotionLabel> {
        self.entries.keys()
    }

    pub fn contains(&self, emotion: &EmotionLabel) -> bool {
        self.entries.contains_key(emotion)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maps a raw label to a known emotion, falling back to `neutral`.
    pub fn normalize(&self, raw: &str) -> EmotionLabel {
        let label = EmotionLabel::new(raw);
        if self.contains(&label) {
            label
        } else {
            EmotionLabel::neutral()
        }
    }

    /// Resolves a sentence's emotion to a reference file on disk.
    pub fn resolve(&self, emotion: Option<&str>) -> ResolvedReference {
        let requested = emotion.map(EmotionLabel::new).unwrap_or_default();
        let wanted = if requested.is_unset() {
            EmotionLabel::neutral()
        } else {
            requested.clone()
        };

        if let Some(path) = self.existing_path(&wanted) {
            return if wanted == requested {
                ResolvedReference::Exact {
                    emotion: wanted,
                    path,
                }
            } else {
                ResolvedReference::Neutral { requested, path }
            };
        }

        debug!("No reference found for emotion '{}'", wanted);
        match self.existing_path(&EmotionLabel::neutral()) {
            Some(path) => ResolvedReference::Neutral { requested, path },
            None => {
                warn!(
                    "Neutral reference missing from {}; keeping current voice",
                    self.dir.display()
                );
                ResolvedReference::Unavailable { requested }
            }
        }
    }

    /// Path for `emotion` if it is known and the file is still present.
    fn existing_path(&self, emotion: &EmotionLabel) -> Option<PathBuf> {
        let path = self
            .entries
            .get(emotion)
            .cloned()
            .unwrap_or_else(|| self.dir.join(format!("{emotion}.{REFERENCE_EXTENSION}")));
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn reference_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"RIFF").unwrap();
        }
        dir
    }

    #[test]
    fn test_load_enumerates_wav_files() {
        let dir = reference_dir(&["neutral.wav", "happy.wav", "Sad.WAV", "notes.txt"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();

        let emotions: Vec<_> = refs.emotions().map(|e| e.as_str().to_string()).collect();
        assert_eq!(emotions, vec!["happy", "neutral", "sad"]);
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn test_load_missing_directory() {
        let result = EmotionReferences::load("/nonexistent/reference_wavs");
        assert!(matches!(result, Err(ReferenceError::DirectoryMissing(_))));
    }

    #[test]
    fn test_load_requires_neutral() {
        let dir = reference_dir(&["happy.wav"]);
        let result = EmotionReferences::load(dir.path());
        assert!(matches!(result, Err(ReferenceError::NeutralMissing(_))));
    }

    #[test]
    fn test_resolve_exact() {
        let dir = reference_dir(&["neutral.wav", "happy.wav"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();

        let resolved = refs.resolve(Some("Happy"));
        assert!(matches!(resolved, ResolvedReference::Exact { .. }));
        assert_eq!(resolved.path(), Some(dir.path().join("happy.wav").as_path()));
        assert_eq!(resolved.effective_emotion().as_str(), "happy");
    }

    #[test]
    fn test_resolve_unset_uses_neutral() {
        let dir = reference_dir(&["neutral.wav"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();

        for emotion in [None, Some(""), Some("None")] {
            let resolved = refs.resolve(emotion);
            assert_eq!(
                resolved.path(),
                Some(dir.path().join("neutral.wav").as_path())
            );
            assert!(resolved.effective_emotion().is_neutral());
        }
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_neutral() {
        let dir = reference_dir(&["neutral.wav", "happy.wav"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();

        let resolved = refs.resolve(Some("jealous"));
        match resolved {
            ResolvedReference::Neutral { requested, path } => {
                assert_eq!(requested.as_str(), "jealous");
                assert_eq!(path, dir.path().join("neutral.wav"));
            }
            other => panic!("Expected neutral fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_removed_file_falls_back() {
        let dir = reference_dir(&["neutral.wav", "happy.wav"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();
        fs::remove_file(dir.path().join("happy.wav")).unwrap();

        let resolved = refs.resolve(Some("happy"));
        assert!(matches!(resolved, ResolvedReference::Neutral { .. }));
    }

    #[test]
    fn test_resolve_without_any_reference() {
        let dir = reference_dir(&["neutral.wav", "happy.wav"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();
        fs::remove_file(dir.path().join("happy.wav")).unwrap();
        fs::remove_file(dir.path().join("neutral.wav")).unwrap();

        let resolved = refs.resolve(Some("happy"));
        assert_eq!(resolved.path(), None);
        assert!(matches!(resolved, ResolvedReference::Unavailable { .. }));
    }

    #[test]
    fn test_normalize_unknown_label() {
        let dir = reference_dir(&["neutral.wav", "angry.wav"]);
        let refs = EmotionReferences::load(dir.path()).unwrap();

        assert_eq!(refs.normalize("ANGRY").as_str(), "angry");
        assert_eq!(refs.normalize("jealous").as_str(), "neutral");
    }
}
