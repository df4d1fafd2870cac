#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use futures::StreamExt;

use tingxie::application::ports::{
    Recognition, RecognitionInfo, RecognitionOptions, RecognizedSegment, ScriptConversionError,
    ScriptConverter, TranscriptionEngine, TranscriptionEngineLoader, TranscriptionError,
};
use tingxie::application::services::{
    EngineHandle, ScriptNormalizer, TranscriptionService, TranscriptionServiceConfig,
    UploadValidator,
};
use tingxie::domain::ConversionProfile;
use tingxie::infrastructure::conversion::ZhconvConverter;
use tingxie::infrastructure::storage::LocalTransientStore;
use tingxie::presentation::{AppState, create_router};

pub const BOUNDARY: &str = "tingxie-test-boundary";

#[derive(Debug, Clone)]
pub enum ScriptedItem {
    Segment(f64, f64, &'static str),
    Fail(&'static str),
}

/// Engine that replays a fixed recognition and records what it was asked to do.
pub struct ScriptedEngine {
    language: String,
    duration: f64,
    items: Vec<ScriptedItem>,
    hang_after_items: bool,
    calls: Mutex<Vec<(PathBuf, bool, RecognitionOptions)>>,
}

impl ScriptedEngine {
    pub fn new(language: &str, duration: f64, items: Vec<ScriptedItem>) -> Self {
        Self {
            language: language.to_string(),
            duration,
            items,
            hang_after_items: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang_after_items = true;
        self
    }

    /// `(audio path, whether the file existed during the call, options)` per call.
    pub fn calls(&self) -> Vec<(PathBuf, bool, RecognitionOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TranscriptionEngine for ScriptedEngine {
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &RecognitionOptions,
    ) -> Result<Recognition, TranscriptionError> {
        self.calls.lock().unwrap().push((
            audio_path.to_path_buf(),
            audio_path.exists(),
            options.clone(),
        ));

        let items: Vec<Result<RecognizedSegment, TranscriptionError>> = self
            .items
            .iter()
            .map(|item| match item {
                ScriptedItem::Segment(start, end, text) => Ok(RecognizedSegment {
                    start: *start,
                    end: *end,
                    text: text.to_string(),
                }),
                ScriptedItem::Fail(message) => {
                    Err(TranscriptionError::TranscriptionFailed(message.to_string()))
                }
            })
            .collect();

        let segments = if self.hang_after_items {
            futures::stream::iter(items)
                .chain(futures::stream::pending())
                .boxed()
        } else {
            futures::stream::iter(items).boxed()
        };

        Ok(Recognition {
            info: RecognitionInfo {
                language: self.language.clone(),
                duration: self.duration,
            },
            segments,
        })
    }
}

/// Loader that counts constructions and can fail a given number of times first.
pub struct CountingLoader {
    engine: Arc<ScriptedEngine>,
    loads: AtomicUsize,
    failures_remaining: AtomicUsize,
    delay: Duration,
}

impl CountingLoader {
    pub fn new(engine: Arc<ScriptedEngine>) -> Self {
        Self {
            engine,
            loads: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_remaining.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TranscriptionEngineLoader for CountingLoader {
    async fn load(&self) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(TranscriptionError::ModelLoadFailed(
                "weights unavailable".to_string(),
            ));
        }

        Ok(Arc::clone(&self.engine) as Arc<dyn TranscriptionEngine>)
    }
}

pub struct FailingConverter;

impl ScriptConverter for FailingConverter {
    fn convert(
        &self,
        _text: &str,
        _profile: ConversionProfile,
    ) -> Result<String, ScriptConversionError> {
        Err(ScriptConversionError::TableUnavailable(
            "conversion table missing".to_string(),
        ))
    }
}

pub fn zhconv_normalizer() -> ScriptNormalizer {
    ScriptNormalizer::new(Arc::new(ZhconvConverter::new()))
}

pub fn build_service(
    engine: Arc<ScriptedEngine>,
    scratch_dir: &Path,
    timeout: Duration,
) -> Arc<TranscriptionService> {
    build_service_with(
        Arc::new(EngineHandle::new(
            Arc::new(CountingLoader::new(engine)),
            1,
        )),
        scratch_dir,
        timeout,
        zhconv_normalizer(),
    )
}

pub fn build_service_with(
    handle: Arc<EngineHandle>,
    scratch_dir: &Path,
    timeout: Duration,
    normalizer: ScriptNormalizer,
) -> Arc<TranscriptionService> {
    let store = LocalTransientStore::new(scratch_dir.to_path_buf()).unwrap();
    Arc::new(TranscriptionService::new(
        UploadValidator::default(),
        Arc::new(store),
        handle,
        normalizer,
        TranscriptionServiceConfig {
            vad_filter: true,
            inference_timeout: timeout,
        },
    ))
}

pub fn build_app(service: Arc<TranscriptionService>, static_dir: &Path) -> Router {
    create_router(AppState::new(service), static_dir, 1024 * 1024)
}

pub fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// `multipart/form-data` body with an optional `audio` file part and text fields.
pub fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((filename, data)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"audio\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
