mod health;
mod transcribe;

pub use health::{HealthResponse, health_handler};
pub use transcribe::{ErrorResponse, TranscriptionResponse, transcribe_handler};
