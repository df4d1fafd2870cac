use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{TranscriptionEngine, TranscriptionEngineLoader, TranscriptionError};

use super::candle_whisper_engine::{CandleWhisperEngine, ComputeType};
use super::openai_whisper_engine::OpenAiWhisperEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionProvider {
    Local,
    OpenAi,
}

impl FromStr for TranscriptionProvider {
    type Err = TranscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "candle" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            other => Err(TranscriptionError::ModelLoadFailed(format!(
                "unknown transcription provider '{}', expected local or openai",
                other
            ))),
        }
    }
}

/// Builds the configured engine when the [`EngineHandle`](crate::application::services::EngineHandle)
/// asks for it. Local model loading runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct TranscriptionEngineFactory {
    provider: TranscriptionProvider,
    model: String,
    compute_type: ComputeType,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl TranscriptionEngineFactory {
    pub fn new(provider: TranscriptionProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            compute_type: ComputeType::Auto,
            api_key: None,
            base_url: None,
        }
    }

    pub fn with_compute_type(mut self, compute_type: ComputeType) -> Self {
        self.compute_type = compute_type;
        self
    }

    pub fn with_api(mut self, api_key: Option<String>, base_url: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self.base_url = base_url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn provider(&self) -> TranscriptionProvider {
        self.provider
    }
}

#[async_trait]
impl TranscriptionEngineLoader for TranscriptionEngineFactory {
    async fn load(&self) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        match self.provider {
            TranscriptionProvider::Local => {
                let model = self.model.clone();
                let compute_type = self.compute_type;
                let engine = tokio::task::spawn_blocking(move || {
                    CandleWhisperEngine::new(&model, compute_type)
                })
                .await
                .map_err(|e| TranscriptionError::ModelLoadFailed(format!("loader task: {}", e)))??;
                Ok(Arc::new(engine))
            }
            TranscriptionProvider::OpenAi => {
                let key = self.api_key.clone().ok_or_else(|| {
                    TranscriptionError::ModelLoadFailed(
                        "API key required for OpenAI Whisper".to_string(),
                    )
                })?;
                let engine =
                    OpenAiWhisperEngine::new(key, self.base_url.clone(), Some(self.model.clone()));
                Ok(Arc::new(engine))
            }
        }
    }
}
