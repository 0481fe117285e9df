//! Chunk relay between the synthesis engine and the audio output.
//!
//! The engine's audio callback only enqueues; a dedicated task drains the
//! queue into the sink so a slow device never stalls synthesis.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::base::{AudioCallback, AudioData, SynthesisError};
use super::output::BoxedSink;

/// Producer side of the chunk queue, handed to the engine as its callback.
#[derive(Debug, Clone)]
pub struct ChunkQueue {
    tx: mpsc::UnboundedSender<AudioData>,
    pending: Arc<AtomicUsize>,
}

impl ChunkQueue {
    /// Chunks enqueued but not yet written to the sink.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn pending_counter(&self) -> Arc<AtomicUsize> {
        self.pending.clone()
    }
}

impl AudioCallback for ChunkQueue {
    fn on_audio(&self, audio_data: AudioData) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.pending.fetch_add(1, Ordering::AcqRel);
            if self.tx.send(audio_data).is_err() {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                warn!("Chunk relay closed, dropping audio chunk");
            }
        })
    }

    fn on_error(&self, error: SynthesisError) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            error!("Synthesis error during playback: {}", error);
        })
    }

    fn on_complete(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {
            debug!("Engine playback complete");
        })
    }
}

/// Consumer side: owns the sink while the relay task runs.
pub struct ChunkRelay {
    rx: mpsc::UnboundedReceiver<AudioData>,
    pending: Arc<AtomicUsize>,
    sink: BoxedSink,
}

impl ChunkRelay {
    /// Creates a connected queue/relay pair.
    pub fn new(sink: BoxedSink) -> (ChunkQueue, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            ChunkQueue {
                tx,
                pending: pending.clone(),
            },
            Self { rx, pending, sink },
        )
    }

    /// Runs the relay until `stop` fires, then writes whatever is still
    /// queued and hands the sink back.
    pub fn spawn(self, stop: CancellationToken) -> JoinHandle<BoxedSink> {
        tokio::spawn(self.run(stop))
    }

    async fn run(mut self, stop: CancellationToken) -> BoxedSink {
        loop {
            tokio::select! {
                biased;
                chunk = self.rx.recv() => match chunk {
                    Some(chunk) => self.write(chunk),
                    None => break,
                },
                _ = stop.cancelled() => break,
            }
        }

        while let Ok(chunk) = self.rx.try_recv() {
            self.write(chunk);
        }
        debug!("Chunk relay stopped");
        self.sink
    }

    fn write(&mut self, chunk: AudioData) {
        if let Err(e) = self.sink.write(&chunk.data) {
            error!("Failed to write audio chunk: {}", e);
        }
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}
