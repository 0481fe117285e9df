pub mod emotion;
pub mod llm;
pub mod router;
pub mod sentence;
pub mod session;
pub mod tts;

// Re-export commonly used types for convenience
pub use emotion::{EmotionLabel, EmotionReferences, ReferenceError, ResolvedReference};

pub use llm::{
    BoxedLanguageModel, Conversation, LanguageModel, LlmError, LlmResult, ScriptedModel,
    create_language_model,
};

pub use router::{RouterEvent, TokenRouter};

pub use sentence::{Sentence, SentenceQueue, SentenceSnapshot};

pub use session::{SessionError, SessionResult, TurnReport, VoiceSession, should_exit};

pub use tts::{
    AudioCallback, AudioData, AudioFormat, AudioSink, BoxedEngine, BoxedSink,
    IncrementalTextBridge, PlaybackCoordinator, PlaybackError, PlaybackSettings, SimulatedEngine,
    SynthesisEngine, SynthesisError, SynthesisResult, TextFeed, create_audio_sink,
    create_synthesis_engine,
};
