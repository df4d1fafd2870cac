use std::sync::Arc;

use crate::application::services::{EngineHandle, TranscriptionService};

#[derive(Clone)]
pub struct AppState {
    pub transcription_service: Arc<TranscriptionService>,
}

impl AppState {
    pub fn new(transcription_service: Arc<TranscriptionService>) -> Self {
        Self {
            transcription_service,
        }
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        self.transcription_service.engine()
    }
}
