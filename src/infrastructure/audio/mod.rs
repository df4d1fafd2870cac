pub mod audio_decoder;
mod candle_whisper_engine;
pub mod mel_filters;
mod openai_whisper_engine;
mod transcription_engine_factory;
pub mod voice_activity;
pub mod whisper_decoder;
pub mod worker_stream;

pub use candle_whisper_engine::{CandleWhisperEngine, ComputeType};
pub use openai_whisper_engine::{OpenAiWhisperEngine, language_code};
pub use transcription_engine_factory::{TranscriptionEngineFactory, TranscriptionProvider};
