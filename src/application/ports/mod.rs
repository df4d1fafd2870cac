mod script_converter;
mod transcription_engine;
mod transient_store;

pub use script_converter::{ScriptConversionError, ScriptConverter};
pub use transcription_engine::{
    Recognition, RecognitionInfo, RecognitionOptions, RecognizedSegment, SegmentStream,
    TranscriptionEngine, TranscriptionEngineLoader, TranscriptionError,
};
pub use transient_store::{StorageError, TransientFile, TransientStore};
