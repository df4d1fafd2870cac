use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    RecognitionOptions, StorageError, TransientFile, TransientStore, TranscriptionError,
};
use crate::domain::{
    ParameterError, RawTranscriptionParams, TranscriptionParams, TranscriptionResult,
    UploadedAudio,
};

use super::engine_handle::EngineHandle;
use super::script_normalizer::ScriptNormalizer;
use super::segment_aggregator::{AggregationError, SegmentAggregator};
use super::upload_validator::{UploadValidator, ValidationError};

const MANDARIN_GUIDANCE_PROMPT: &str = "以下是普通話的轉錄內容。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Validating,
    Persisting,
    EngineReady,
    Transcribing,
    Aggregating,
    Cleaning,
    Responding,
}

impl RequestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStage::Validating => "VALIDATING",
            RequestStage::Persisting => "PERSISTING",
            RequestStage::EngineReady => "ENGINE_READY",
            RequestStage::Transcribing => "TRANSCRIBING",
            RequestStage::Aggregating => "AGGREGATING",
            RequestStage::Cleaning => "CLEANING",
            RequestStage::Responding => "RESPONDING",
        }
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("engine load failed: {0}")]
    EngineLoad(TranscriptionError),
    #[error("inference failed: {0}")]
    Inference(TranscriptionError),
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("transcription timed out after {0:?}")]
    Timeout(Duration),
}

impl TranscribeError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TranscribeError::Validation(_) | TranscribeError::InvalidParameters(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionServiceConfig {
    pub vad_filter: bool,
    pub inference_timeout: Duration,
}

impl Default for TranscriptionServiceConfig {
    fn default() -> Self {
        Self {
            vad_filter: true,
            inference_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptionRequest {
    pub audio: Option<UploadedAudio>,
    pub params: RawTranscriptionParams,
}

/// End-to-end handling of one transcription request.
///
/// Once the upload has been written to disk it is released on every path out of
/// [`TranscriptionService::transcribe`]; the [`TransientFile`] guard covers the paths
/// where the future itself is dropped.
pub struct TranscriptionService {
    validator: UploadValidator,
    store: Arc<dyn TransientStore>,
    engine: Arc<EngineHandle>,
    normalizer: ScriptNormalizer,
    config: TranscriptionServiceConfig,
}

impl TranscriptionService {
    pub fn new(
        validator: UploadValidator,
        store: Arc<dyn TransientStore>,
        engine: Arc<EngineHandle>,
        normalizer: ScriptNormalizer,
        config: TranscriptionServiceConfig,
    ) -> Self {
        Self {
            validator,
            store,
            engine,
            normalizer,
            config,
        }
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    pub async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let upload = self.validator.validate(request.audio.as_ref()).map_err(|e| {
            tracing::warn!(stage = %RequestStage::Validating, error = %e, "Upload rejected");
            e
        })?;

        let filename = upload.filename.as_deref().unwrap_or_default();
        tracing::debug!(
            stage = %RequestStage::Persisting,
            filename = %filename,
            bytes = upload.size_bytes(),
            "Persisting upload"
        );
        let file = self.store.acquire(&upload.data, filename).await?;

        let outcome = self.run_with_file(&file, request.params).await;

        tracing::debug!(stage = %RequestStage::Cleaning, path = %file.path().display(), "Releasing upload");
        let released = self.store.release(file).await;

        match (outcome, released) {
            (Ok(result), Ok(())) => {
                tracing::debug!(stage = %RequestStage::Responding, "Transcription succeeded");
                Ok(result)
            }
            (Ok(_), Err(e)) => {
                tracing::error!(error = %e, "Failed to release upload after transcription");
                Err(TranscribeError::Storage(e))
            }
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                tracing::error!(
                    error = %release_err,
                    "Failed to release upload after failed transcription"
                );
                Err(e)
            }
        }
    }

    async fn run_with_file(
        &self,
        file: &TransientFile,
        raw_params: RawTranscriptionParams,
    ) -> Result<TranscriptionResult, TranscribeError> {
        self.engine
            .ensure_ready()
            .await
            .map_err(TranscribeError::EngineLoad)?;

        let params = TranscriptionParams::try_from(raw_params)?;
        let options = self.recognition_options(&params);

        tracing::info!(
            stage = %RequestStage::Transcribing,
            language = ?params.language,
            beam_size = params.beam_size.get(),
            normalize_script = params.normalize_script,
            "Starting transcription"
        );

        let timeout = self.config.inference_timeout;
        match tokio::time::timeout(timeout, self.recognize(file, &options, &params)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_secs = timeout.as_secs(), "Transcription timed out");
                Err(TranscribeError::Timeout(timeout))
            }
        }
    }

    async fn recognize(
        &self,
        file: &TransientFile,
        options: &RecognitionOptions,
        params: &TranscriptionParams,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let recognition = self
            .engine
            .invoke(file.path(), options)
            .await
            .map_err(TranscribeError::Inference)?;

        tracing::debug!(
            stage = %RequestStage::Aggregating,
            language = %recognition.info.language,
            duration = recognition.info.duration,
            "Engine started emitting segments"
        );

        let normalization = (params.normalize_script
            && self.normalizer.applies_to(&recognition.info.language))
        .then_some((&self.normalizer, params.conversion_profile));

        let result = SegmentAggregator::new(normalization)
            .aggregate(recognition.info, recognition.segments)
            .await?;

        tracing::info!(
            language = %result.language,
            duration = result.duration,
            segments = result.segments.len(),
            "Transcription completed"
        );

        Ok(result)
    }

    fn recognition_options(&self, params: &TranscriptionParams) -> RecognitionOptions {
        RecognitionOptions {
            language: params.language.clone(),
            beam_size: params.beam_size.get() as usize,
            vad_filter: self.config.vad_filter,
            initial_prompt: guidance_prompt(params.language.as_deref()).map(String::from),
        }
    }
}

/// Prompt that biases the decoder toward the expected script for a hinted language.
pub fn guidance_prompt(language: Option<&str>) -> Option<&'static str> {
    match language {
        Some("zh") => Some(MANDARIN_GUIDANCE_PROMPT),
        _ => None,
    }
}
