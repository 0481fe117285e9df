//! One voice chat session: conversation turns from user text to audio.
//!
//! A [`VoiceSession`] owns the language model, the synthesis engine and the
//! audio sink across turns. Each turn gets a fresh [`SentenceQueue`]; the
//! model's tokens are routed into it while a [`PlaybackCoordinator`] plays
//! sentences as they appear.
//!
//! ```text
//!  user text ─▶ LanguageModel ─tokens─▶ TokenRouter ─▶ SentenceQueue
//!                                                          │
//!                                       PlaybackCoordinator ◀┘
//!                                         │            │
//!                                   SynthesisEngine ─▶ AudioSink
//! ```

mod prompt;

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use prompt::{render_system_prompt, valid_emotions_str};

use crate::config::{ConfigError, SessionConfig};
use crate::core::emotion::{EmotionReferences, ReferenceError};
use crate::core::llm::{BoxedLanguageModel, LlmError, create_language_model};
use crate::core::router::{RouterEvent, TokenRouter};
use crate::core::sentence::SentenceQueue;
use crate::core::tts::{
    AudioOutputError, BoxedEngine, BoxedSink, PlaybackCoordinator, PlaybackError, SynthesisError,
    TextFeed, create_audio_sink, create_synthesis_engine,
};

/// Text synthesized once at startup so the first reply starts promptly.
const WARMUP_TEXT: &str = "hi!";

/// Longest input still treated as an exit command.
const EXIT_COMMAND_MAX_CHARS: usize = 7;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    References(#[from] ReferenceError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Audio output error: {0}")]
    Output(#[from] AudioOutputError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Session is closed")]
    Closed,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Whether the user's input asks to end the session.
///
/// Only short inputs count, so a sentence that merely mentions "exit" does
/// not end the chat.
pub fn should_exit(text: &str) -> bool {
    text.chars().count() <= EXIT_COMMAND_MAX_CHARS && text.to_lowercase().contains("exit")
}

/// Summary of a finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Raw assistant reply including emotion markers.
    pub transcript: String,
    /// Emotions in the order the reply switched to them.
    pub emotions: Vec<String>,
}

pub struct VoiceSession {
    config: SessionConfig,
    references: Arc<EmotionReferences>,
    system_prompt: String,
    model: BoxedLanguageModel,
    engine: Option<BoxedEngine>,
    sink: Option<BoxedSink>,
}

impl VoiceSession {
    /// Builds every component from `config` and starts the session.
    pub async fn start(config: SessionConfig) -> SessionResult<Self> {
        let engine = create_synthesis_engine(&config.tts.engine, config.tts.audio_format())?;
        let model = create_language_model(&config.llm)?;
        let sink = create_audio_sink(config.tts.output_path());
        Self::with_components(config, engine, model, sink).await
    }

    /// Starts a session around already constructed components.
    ///
    /// Loads the emotion references, renders the system prompt, warms the
    /// engine up and opens the sink.
    pub async fn with_components(
        config: SessionConfig,
        mut engine: BoxedEngine,
        model: BoxedLanguageModel,
        mut sink: BoxedSink,
    ) -> SessionResult<Self> {
        let references = Arc::new(EmotionReferences::load(&config.tts.references_dir)?);
        info!(
            dir = %references.dir().display(),
            emotions = %valid_emotions_str(references.emotions()),
            "Loaded emotion references"
        );

        let system_prompt = render_system_prompt(&config.chat, references.emotions());
        debug!(prompt = %system_prompt, "Rendered system prompt");

        if let Some(path) = references.resolve(None).path() {
            engine.set_reference(path)?;
        }
        engine.feed(TextFeed::from(WARMUP_TEXT))?;
        engine.play_muted().await?;
        info!(engine = engine.name(), model = model.name(), "Engine warmed up");

        sink.open(config.tts.audio_format())?;

        Ok(Self {
            config,
            references,
            system_prompt,
            model,
            engine: Some(engine),
            sink: Some(sink),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn references(&self) -> &EmotionReferences {
        &self.references
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Runs one conversation turn and returns once its audio was written.
    ///
    /// `on_event` sees every emotion change and text piece as it is routed,
    /// in reply order.
    pub async fn run_turn<F>(&mut self, user_text: &str, mut on_event: F) -> SessionResult<TurnReport>
    where
        F: FnMut(&RouterEvent) + Send,
    {
        let engine = self.engine.take().ok_or(SessionError::Closed)?;
        let Some(sink) = self.sink.take() else {
            self.engine = Some(engine);
            return Err(SessionError::Closed);
        };

        self.model.add_user_text(user_text);

        let queue = Arc::new(SentenceQueue::new());
        let coordinator = PlaybackCoordinator::start(
            engine,
            sink,
            queue.clone(),
            self.references.clone(),
            self.config.tts.playback_settings(),
        );

        let mut router = TokenRouter::new(queue).with_valid_emotions(self.references.emotions());
        let mut emotions = Vec::new();
        let mut record = |event: &RouterEvent| {
            if let RouterEvent::Emotion(emotion) = event {
                emotions.push(emotion.to_string());
            }
            on_event(event);
        };

        let generation = {
            let mut on_token = |token: &str| {
                for event in router.push_token(token) {
                    record(&event);
                }
            };
            self.model
                .generate_response(&self.system_prompt, &mut on_token)
                .await
        };
        for event in router.finish() {
            record(&event);
        }
        let transcript = router.into_transcript();

        if generation.is_ok() {
            self.model.add_assistant_text(&transcript);
            if let Err(e) = self.model.write_payload() {
                warn!("Failed to write request payload: {}", e);
            }
        }

        self.wait_for_completion(&coordinator).await;
        let (engine, mut sink) = coordinator.stop().await?;
        let flushed = sink.flush();
        self.engine = Some(engine);
        self.sink = Some(sink);

        generation?;
        flushed?;
        info!(chars = transcript.len(), "Turn finished");
        Ok(TurnReport {
            transcript,
            emotions,
        })
    }

    /// Waits until playback has been idle for the configured settle window.
    async fn wait_for_completion(&self, coordinator: &PlaybackCoordinator) {
        let poll = self.config.tts.playback_settings().poll_interval;
        let settle = self.config.tts.completion_settle();
        let mut idle_since: Option<Instant> = None;

        loop {
            if coordinator.is_idle() {
                let since = *idle_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= settle {
                    return;
                }
            } else {
                idle_since = None;
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Releases the engine and closes the sink.
    pub async fn shutdown(mut self) -> SessionResult<()> {
        if let Some(mut engine) = self.engine.take() {
            engine.shutdown().await?;
        }
        if let Some(mut sink) = self.sink.take() {
            sink.close()?;
        }
        info!("Session closed");
        Ok(())
    }
}
