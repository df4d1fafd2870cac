mod engine_handle;
mod script_normalizer;
mod segment_aggregator;
mod transcription_service;
mod upload_validator;

pub use engine_handle::{EngineHandle, EngineState};
pub use script_normalizer::ScriptNormalizer;
pub use segment_aggregator::{AggregationError, SegmentAggregator};
pub use transcription_service::{
    RequestStage, TranscribeError, TranscriptionRequest, TranscriptionService,
    TranscriptionServiceConfig, guidance_prompt,
};
pub use upload_validator::{DEFAULT_AUDIO_EXTENSIONS, UploadValidator, ValidationError};
