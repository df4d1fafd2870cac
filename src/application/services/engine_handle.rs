use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio::sync::{OnceCell, Semaphore};

use crate::application::ports::{
    Recognition, RecognitionOptions, TranscriptionEngine, TranscriptionEngineLoader,
    TranscriptionError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Unloaded => "UNLOADED",
            EngineState::Loading => "LOADING",
            EngineState::Ready => "READY",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared, lazily constructed transcription engine.
///
/// Construction happens at most once per successful load: concurrent first callers of
/// [`EngineHandle::ensure_ready`] wait on the same initialization. A failed load leaves
/// the handle `Unloaded` so the next request tries again.
///
/// Inference is bounded by `max_concurrent_inferences` permits. A permit stays attached
/// to the returned segment stream until the stream is dropped.
pub struct EngineHandle {
    loader: Arc<dyn TranscriptionEngineLoader>,
    engine: OnceCell<Arc<dyn TranscriptionEngine>>,
    loading: AtomicBool,
    inference_permits: Arc<Semaphore>,
}

impl EngineHandle {
    pub fn new(loader: Arc<dyn TranscriptionEngineLoader>, max_concurrent_inferences: usize) -> Self {
        Self {
            loader,
            engine: OnceCell::new(),
            loading: AtomicBool::new(false),
            inference_permits: Arc::new(Semaphore::new(max_concurrent_inferences.max(1))),
        }
    }

    pub fn state(&self) -> EngineState {
        if self.engine.initialized() {
            EngineState::Ready
        } else if self.loading.load(Ordering::Acquire) {
            EngineState::Loading
        } else {
            EngineState::Unloaded
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.initialized()
    }

    pub async fn ensure_ready(&self) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let _loading = LoadingFlag::raise(&self.loading);
                tracing::info!("Loading transcription engine");
                let started = std::time::Instant::now();

                let result = self.loader.load().await;

                match &result {
                    Ok(_) => tracing::info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Transcription engine ready"
                    ),
                    Err(e) => tracing::error!(error = %e, "Transcription engine failed to load"),
                }
                result
            })
            .await?;

        Ok(Arc::clone(engine))
    }

    pub async fn invoke(
        &self,
        audio_path: &Path,
        options: &RecognitionOptions,
    ) -> Result<Recognition, TranscriptionError> {
        let engine = self.engine.get().ok_or(TranscriptionError::EngineNotReady)?;

        let permit = Arc::clone(&self.inference_permits)
            .acquire_owned()
            .await
            .map_err(|e| TranscriptionError::TranscriptionFailed(e.to_string()))?;

        let recognition = engine.transcribe(audio_path, options).await?;

        let segments = recognition
            .segments
            .map(move |item| {
                let _held = &permit;
                item
            })
            .boxed();

        Ok(Recognition {
            info: recognition.info,
            segments,
        })
    }
}

/// Marks a load in progress; cleared on drop so a cancelled load reads as `Unloaded`.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
