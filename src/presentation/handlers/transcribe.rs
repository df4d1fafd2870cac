use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::{TranscribeError, TranscriptionRequest};
use crate::domain::{RawTranscriptionParams, Segment, TranscriptionResult, UploadedAudio};
use crate::infrastructure::observability::transcript_preview;
use crate::presentation::state::AppState;

const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub success: bool,
    pub language: String,
    pub duration: f64,
    pub full_text: String,
    pub segments: Vec<Segment>,
}

impl From<TranscriptionResult> for TranscriptionResponse {
    fn from(result: TranscriptionResult) -> Self {
        Self {
            success: true,
            language: result.language,
            duration: result.duration,
            full_text: result.full_text,
            segments: result.segments,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn transcribe_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected non-multipart upload");
            return (
                rejection.status(),
                Json(ErrorResponse {
                    error: format!("Invalid upload request: {}", rejection.body_text()),
                }),
            )
                .into_response();
        }
    };

    let request = match read_request(multipart).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read multipart body");
            return (
                e.status(),
                Json(ErrorResponse {
                    error: format!("Failed to read upload: {}", e.body_text()),
                }),
            )
                .into_response();
        }
    };

    match state.transcription_service.transcribe(request).await {
        Ok(result) => {
            tracing::info!(
                language = %result.language,
                segments = result.segments.len(),
                preview = %transcript_preview(&result.full_text),
                "Transcription response ready"
            );
            (StatusCode::OK, Json(TranscriptionResponse::from(result))).into_response()
        }
        Err(e) if e.is_client_error() => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Transcription request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: server_error_message(&e),
                }),
            )
                .into_response()
        }
    }
}

fn server_error_message(error: &TranscribeError) -> String {
    format!("Transcription failed: {}", error)
}

async fn read_request(mut multipart: Multipart) -> Result<TranscriptionRequest, MultipartError> {
    let mut audio: Option<UploadedAudio> = None;
    let mut params = RawTranscriptionParams::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            AUDIO_FIELD if audio.is_none() => {
                let filename = field.file_name().map(str::to_string);
                let data = field.bytes().await?;
                tracing::debug!(filename = ?filename, bytes = data.len(), "Audio field received");
                audio = Some(UploadedAudio::new(filename, data));
            }
            "language" => params.language = Some(field.text().await?),
            "beam_size" => params.beam_size = Some(field.text().await?),
            "to_traditional" => params.to_traditional = Some(field.text().await?),
            "phrase_conversion" => params.phrase_conversion = Some(field.text().await?),
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(TranscriptionRequest { audio, params })
}
