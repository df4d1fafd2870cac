use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// A recognized span of speech exactly as the engine emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionInfo {
    pub language: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    pub language: Option<String>,
    pub beam_size: usize,
    pub vad_filter: bool,
    pub initial_prompt: Option<String>,
}

/// Forward-only, single-use sequence of segments. Engines produce items while they
/// decode, so an `Err` can arrive after earlier segments were yielded.
pub type SegmentStream = BoxStream<'static, Result<RecognizedSegment, TranscriptionError>>;

pub struct Recognition {
    pub info: RecognitionInfo,
    pub segments: SegmentStream,
}

impl fmt::Debug for Recognition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recognition")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &RecognitionOptions,
    ) -> Result<Recognition, TranscriptionError>;
}

/// Builds the heavy engine on first demand.
#[async_trait]
pub trait TranscriptionEngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("audio decoding failed: {0}")]
    DecodingFailed(String),
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("transcription engine is not loaded")]
    EngineNotReady,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
