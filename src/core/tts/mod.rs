mod base;
mod bridge;
mod coordinator;
mod output;
mod relay;
mod simulated;

pub use base::{
    AudioCallback, AudioData, BoxedEngine, PlaybackProbe, SynthesisEngine, SynthesisError,
    SynthesisResult, TextFeed,
};
pub use bridge::IncrementalTextBridge;
pub use coordinator::{
    PlaybackCoordinator, PlaybackError, PlaybackResult, PlaybackSettings, PlaybackStrategy,
};
pub use output::{
    AudioFormat, AudioOutputError, AudioOutputResult, AudioSink, BoxedSink, MemorySink, NullSink,
    WavFileSink, create_audio_sink,
};
pub use relay::{ChunkQueue, ChunkRelay};
pub use simulated::{SimulatedEngine, SimulatedEngineConfig, SynthesisHistory, Utterance};

/// Factory function to create a synthesis engine.
///
/// # Supported Engines
///
/// - `"simulated"` or `"sim"` - in-process engine generating PCM silence
///
/// # Example
///
/// ```rust
/// use waav_voice_chat::core::tts::{AudioFormat, create_synthesis_engine};
///
/// let engine = create_synthesis_engine("simulated", AudioFormat::default()).unwrap();
/// assert_eq!(engine.name(), "simulated");
/// ```
pub fn create_synthesis_engine(
    engine_type: &str,
    format: AudioFormat,
) -> SynthesisResult<BoxedEngine> {
    match engine_type.to_lowercase().as_str() {
        "simulated" | "sim" => Ok(Box::new(SimulatedEngine::new(SimulatedEngineConfig {
            sample_rate: format.sample_rate,
            channels: format.channels,
            ..Default::default()
        }))),
        _ => Err(SynthesisError::Engine(format!(
            "Unsupported synthesis engine: {engine_type}. Supported engines: simulated"
        ))),
    }
}
