//! Test Fixtures Module
//!
//! Shared helpers for the integration tests:
//! - Emotion reference directories
//! - Fast simulated engines
//! - An engine that rejects selected sentences

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod engines;

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use waav_voice_chat::SessionConfig;
use waav_voice_chat::core::tts::{PlaybackSettings, SimulatedEngine, SimulatedEngineConfig};

pub use engines::*;

/// Creates a reference directory holding `<name>.wav` for every name.
pub fn reference_dir(names: &[&str]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for name in names {
        std::fs::write(dir.path().join(format!("{name}.wav")), b"RIFF")
            .expect("Failed to write reference");
    }
    dir
}

pub fn default_references() -> TempDir {
    reference_dir(&["neutral", "happy", "sad", "angry"])
}

pub fn fast_engine_config() -> SimulatedEngineConfig {
    SimulatedEngineConfig {
        frames_per_char: 4,
        chunk_frames: 64,
        chunk_delay: Duration::ZERO,
        ..Default::default()
    }
}

pub fn fast_engine() -> SimulatedEngine {
    SimulatedEngine::new(fast_engine_config())
}

pub fn fast_settings() -> PlaybackSettings {
    PlaybackSettings {
        poll_interval: Duration::from_millis(2),
        idle_interval: Duration::from_millis(2),
    }
}

/// Session configuration with short intervals and a scripted model.
pub fn session_config(references: PathBuf, script: &[&str]) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.tts.references_dir = references;
    config.tts.poll_interval_ms = 2;
    config.tts.idle_interval_ms = 2;
    config.tts.completion_settle_ms = 40;
    config.llm.script = script.iter().map(|s| s.to_string()).collect();
    config.llm.token_delay_ms = 1;
    config
}
