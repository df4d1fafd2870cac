use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{
    Recognition, RecognitionInfo, RecognitionOptions, RecognizedSegment, TranscriptionEngine,
    TranscriptionError,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "whisper-1";

/// Remote recognition through an OpenAI-compatible `/audio/transcriptions` endpoint.
pub struct OpenAiWhisperEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

impl OpenAiWhisperEngine {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl TranscriptionEngine for OpenAiWhisperEngine {
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &RecognitionOptions,
    ) -> Result<Recognition, TranscriptionError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let audio = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        let file_part = multipart::Part::bytes(audio).file_name(file_name);

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .part("file", file_part);
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &options.initial_prompt {
            form = form.text("prompt", prompt.clone());
        }

        tracing::debug!(model = %self.model, "Sending audio to OpenAI Whisper API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TranscriptionError::ApiRequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("body: {}", e)))?;

        let language = body
            .language
            .as_deref()
            .map(language_code)
            .or_else(|| options.language.clone())
            .unwrap_or_default();
        let duration = body
            .duration
            .or_else(|| body.segments.last().map(|s| s.end))
            .unwrap_or(0.0);

        tracing::info!(
            language = %language,
            segments = body.segments.len(),
            chars = body.text.chars().count(),
            "OpenAI Whisper transcription completed"
        );

        let segments: Vec<Result<RecognizedSegment, TranscriptionError>> = body
            .segments
            .into_iter()
            .map(|s| {
                Ok(RecognizedSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
            })
            .collect();

        Ok(Recognition {
            info: RecognitionInfo { language, duration },
            segments: futures::stream::iter(segments).boxed(),
        })
    }
}

/// The API reports languages by English name ("chinese"); the rest of the service
/// works with ISO codes ("zh"). Unknown names are passed through lowercased.
pub fn language_code(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let code = match lowered.as_str() {
        "chinese" | "mandarin" => "zh",
        "cantonese" => "yue",
        "english" => "en",
        "japanese" => "ja",
        "korean" => "ko",
        "german" => "de",
        "french" => "fr",
        "spanish" => "es",
        "portuguese" => "pt",
        "italian" => "it",
        "russian" => "ru",
        "dutch" => "nl",
        "arabic" => "ar",
        "hindi" => "hi",
        "thai" => "th",
        "vietnamese" => "vi",
        "indonesian" => "id",
        "malay" => "ms",
        "turkish" => "tr",
        "polish" => "pl",
        "ukrainian" => "uk",
        "swedish" => "sv",
        _ => return lowered,
    };
    code.to_string()
}
