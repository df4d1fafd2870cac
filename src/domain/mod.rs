mod scratch_file_name;
mod segment;
mod transcription_params;
mod transcription_result;
mod uploaded_audio;

pub use scratch_file_name::{ScratchFileName, sanitize};
pub use segment::{Segment, round_to_hundredths};
pub use transcription_params::{
    BeamSize, ConversionProfile, DEFAULT_BEAM_SIZE, ParameterError, RawTranscriptionParams,
    TranscriptionParams,
};
pub use transcription_result::TranscriptionResult;
pub use uploaded_audio::UploadedAudio;
