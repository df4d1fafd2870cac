use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc, oneshot};

use crate::application::ports::{
    Recognition, RecognitionInfo, RecognitionOptions, RecognizedSegment, TranscriptionEngine,
    TranscriptionError,
};

use super::audio_decoder::{TARGET_SAMPLE_RATE, decode_audio_file, pcm_duration_secs};
use super::mel_filters::mel_filterbank;
use super::voice_activity::{voiced_frames, voiced_windows};
use super::whisper_decoder::{SpecialTokens, TimedTokens, WindowDecoder, split_at_timestamps};
use super::worker_stream::{worker_failed, worker_segments};

const SEGMENT_CHANNEL_CAPACITY: usize = 16;
const NO_SPEECH_THRESHOLD: f64 = 0.6;
const LOGPROB_THRESHOLD: f64 = -1.0;
const WINDOW_SECS: f64 = m::N_SAMPLES as f64 / TARGET_SAMPLE_RATE as f64;

const WHISPER_LANGUAGES: &[&str] = &[
    "en", "zh", "de", "es", "ru", "ko", "fr", "ja", "pt", "tr", "pl", "ca", "nl", "ar", "sv",
    "it", "id", "hi", "fi", "vi", "he", "uk", "el", "ms", "cs", "ro", "da", "hu", "ta", "no",
    "th", "ur", "hr", "bg", "lt", "la", "mi", "ml", "cy", "sk", "te", "fa", "lv", "bn", "sr",
    "az", "sl", "kn", "et", "mk", "br", "eu", "is", "hy", "ne", "mn", "bs", "kk", "sq", "sw",
    "gl", "mr", "pa", "si", "km", "sn", "yo", "so", "af", "oc", "ka", "be", "tg", "sd", "gu",
    "am", "yi", "lo", "uz", "fo", "ht", "ps", "tk", "nn", "mt", "sa", "lb", "my", "bo", "tl",
    "mg", "as", "tt", "haw", "ln", "ha", "ba", "jw", "su", "yue",
];

/// Numeric precision the weights are loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeType {
    /// F16 on accelerators, F32 on CPU.
    #[default]
    Auto,
    F32,
    F16,
    Bf16,
}

impl FromStr for ComputeType {
    type Err = TranscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "default" => Ok(Self::Auto),
            "f32" | "float32" => Ok(Self::F32),
            "f16" | "float16" => Ok(Self::F16),
            "bf16" | "bfloat16" => Ok(Self::Bf16),
            other => Err(TranscriptionError::ModelLoadFailed(format!(
                "unsupported compute_type '{}', expected auto, f32, f16 or bf16",
                other
            ))),
        }
    }
}

struct WhisperState {
    model: m::model::Whisper,
    tokenizer: Tokenizer,
    config: Config,
    device: Device,
    dtype: DType,
    mel_filters: Vec<f32>,
    special: SpecialTokens,
    language_tokens: Vec<(&'static str, u32)>,
}

/// Local Whisper inference with candle. The model needs `&mut` for every forward pass,
/// so one transcription holds the model until its segment stream has been produced.
pub struct CandleWhisperEngine {
    state: Arc<Mutex<WhisperState>>,
}

impl CandleWhisperEngine {
    /// Downloads (or reuses the cached) checkpoint and loads it. Blocking.
    pub fn new(model_id: &str, compute_type: ComputeType) -> Result<Self, TranscriptionError> {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        let dtype = Self::select_dtype(&device, compute_type);

        tracing::info!(
            device = ?device,
            dtype = ?dtype,
            model = model_id,
            "Initializing Candle Whisper transcription engine"
        );

        let api = Api::new().map_err(|e| TranscriptionError::ModelLoadFailed(e.to_string()))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| load_failed("config.json", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| load_failed("tokenizer.json", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| load_failed("model.safetensors", e))?;

        let config_contents =
            std::fs::read_to_string(&config_path).map_err(|e| load_failed("read config", e))?;
        let config: Config =
            serde_json::from_str(&config_contents).map_err(|e| load_failed("parse config", e))?;

        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| load_failed("tokenizer", e))?;
        let special = special_tokens(&tokenizer)?;
        let language_tokens: Vec<(&'static str, u32)> = WHISPER_LANGUAGES
            .iter()
            .filter_map(|code| {
                tokenizer
                    .token_to_id(&format!("<|{}|>", code))
                    .map(|id| (*code, id))
            })
            .collect();

        let mel_filters = mel_filterbank(config.num_mel_bins, m::N_FFT, TARGET_SAMPLE_RATE);

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], dtype, &device)
                .map_err(|e| load_failed("weights", e))?
        };
        let model =
            m::model::Whisper::load(&vb, config.clone()).map_err(|e| load_failed("model", e))?;

        tracing::info!(
            languages = language_tokens.len(),
            timestamps = special.timestamp_begin.is_some(),
            "Candle Whisper engine loaded successfully"
        );

        Ok(Self {
            state: Arc::new(Mutex::new(WhisperState {
                model,
                tokenizer,
                config,
                device,
                dtype,
                mel_filters,
                special,
                language_tokens,
            })),
        })
    }

    pub fn select_dtype(device: &Device, compute_type: ComputeType) -> DType {
        match compute_type {
            ComputeType::Auto if device.is_cpu() => DType::F32,
            ComputeType::Auto => DType::F16,
            ComputeType::F32 => DType::F32,
            ComputeType::F16 => DType::F16,
            ComputeType::Bf16 => DType::BF16,
        }
    }
}

#[async_trait]
impl TranscriptionEngine for CandleWhisperEngine {
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &RecognitionOptions,
    ) -> Result<Recognition, TranscriptionError> {
        let state = Arc::clone(&self.state).lock_owned().await;
        let path = audio_path.to_path_buf();
        let options = options.clone();

        let (info_tx, info_rx) = oneshot::channel();
        let (segment_tx, segment_rx) = mpsc::channel(SEGMENT_CHANNEL_CAPACITY);

        let worker = tokio::task::spawn_blocking(move || {
            run_transcription(state, path, options, info_tx, segment_tx)
        });

        let info = match info_rx.await {
            Ok(info) => info?,
            Err(_) => {
                return Err(match worker.await {
                    Err(e) => worker_failed(e),
                    Ok(()) => TranscriptionError::TranscriptionFailed(
                        "transcription worker exited".to_string(),
                    ),
                });
            }
        };

        let segments = worker_segments(segment_rx, worker);

        Ok(Recognition { info, segments })
    }
}

type SegmentSender = mpsc::Sender<Result<RecognizedSegment, TranscriptionError>>;

struct PreparedAudio {
    pcm: Vec<f32>,
    voiced: Vec<bool>,
    language: String,
    language_token: u32,
}

fn run_transcription(
    mut state: OwnedMutexGuard<WhisperState>,
    path: PathBuf,
    options: RecognitionOptions,
    info_tx: oneshot::Sender<Result<RecognitionInfo, TranscriptionError>>,
    segment_tx: SegmentSender,
) {
    let prepared = match state.prepare(&path, &options) {
        Ok(p) => p,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    let duration = pcm_duration_secs(&prepared.pcm);
    let info = RecognitionInfo {
        language: prepared.language.clone(),
        duration,
    };
    if info_tx.send(Ok(info)).is_err() {
        return;
    }

    if let Err(e) = state.stream_segments(&prepared, &options, &segment_tx) {
        tracing::error!(error = %e, "Whisper decoding failed");
        let _ = segment_tx.blocking_send(Err(e));
    }
    state.model.reset_kv_cache();
}

impl WhisperState {
    fn prepare(
        &mut self,
        path: &Path,
        options: &RecognitionOptions,
    ) -> Result<PreparedAudio, TranscriptionError> {
        let pcm = decode_audio_file(path)?;

        let voiced = if options.vad_filter {
            let frames = voiced_frames(&pcm)?;
            voiced_windows(&frames, pcm.len(), m::N_SAMPLES)
        } else {
            vec![true; pcm.len().div_ceil(m::N_SAMPLES)]
        };

        let language = match options.language.as_deref() {
            Some(code) => code.to_lowercase(),
            None => {
                let first = voiced.iter().position(|&v| v).unwrap_or(0);
                let start = first * m::N_SAMPLES;
                let end = (start + m::N_SAMPLES).min(pcm.len());
                let features = self.encode_window(&pcm[start..end])?;
                self.detect_language(&features)?.to_string()
            }
        };

        let language_token = self
            .language_tokens
            .iter()
            .find(|(code, _)| *code == language)
            .map(|(_, id)| *id)
            .ok_or_else(|| {
                TranscriptionError::TranscriptionFailed(format!(
                    "language '{}' is not supported by this model",
                    language
                ))
            })?;

        tracing::debug!(
            language = %language,
            windows = voiced.len(),
            voiced_windows = voiced.iter().filter(|&&v| v).count(),
            "Audio prepared for decoding"
        );

        Ok(PreparedAudio {
            pcm,
            voiced,
            language,
            language_token,
        })
    }

    fn stream_segments(
        &mut self,
        prepared: &PreparedAudio,
        options: &RecognitionOptions,
        segment_tx: &SegmentSender,
    ) -> Result<(), TranscriptionError> {
        let duration = pcm_duration_secs(&prepared.pcm);
        let max_context = self.config.max_target_positions / 2 - 1;
        let sample_len = self.config.max_target_positions / 2;
        let special = self.special.clone();
        let suppress = self.config.suppress_tokens.clone();

        let mut context: Vec<u32> = match options.initial_prompt.as_deref() {
            Some(prompt) => self
                .tokenizer
                .encode(format!(" {}", prompt.trim()), false)
                .map_err(|e| TranscriptionError::TranscriptionFailed(format!("prompt: {}", e)))?
                .get_ids()
                .to_vec(),
            None => Vec::new(),
        };

        for (index, window) in prepared.pcm.chunks(m::N_SAMPLES).enumerate() {
            if !prepared.voiced.get(index).copied().unwrap_or(true) {
                tracing::debug!(window = index, "Skipping window without speech");
                continue;
            }

            let offset = index as f64 * WINDOW_SECS;
            let window_secs = pcm_duration_secs(window);
            let features = self.encode_window(window)?;

            let previous = &context[context.len().saturating_sub(max_context)..];
            let decoder = WindowDecoder::new(&special, &suppress, options.beam_size, sample_len)
                .with_context_limit(self.config.max_target_positions);
            let prompt = decoder.prompt(Some(prepared.language_token), previous);

            let decoded = decoder
                .decode(&prompt, |sequence, flush| {
                    self.last_logits(sequence, &features, flush)
                })
                .map_err(|e| TranscriptionError::TranscriptionFailed(format!("decoder: {}", e)))?;

            if decoded.no_speech_prob > NO_SPEECH_THRESHOLD
                && decoded.avg_logprob < LOGPROB_THRESHOLD
            {
                tracing::debug!(
                    window = index,
                    no_speech_prob = decoded.no_speech_prob,
                    "Window classified as silence"
                );
                continue;
            }

            let runs = match special.timestamp_begin {
                Some(ts_begin) => split_at_timestamps(&decoded.tokens, ts_begin),
                None => vec![TimedTokens {
                    start: None,
                    end: None,
                    tokens: decoded.tokens.clone(),
                }],
            };

            for run in runs {
                let text = self.tokenizer.decode(&run.tokens, true).map_err(|e| {
                    TranscriptionError::TranscriptionFailed(format!("detokenize: {}", e))
                })?;
                if text.trim().is_empty() {
                    continue;
                }

                let start = (offset + run.start.unwrap_or(0.0)).min(duration);
                let end = (offset + run.end.unwrap_or(window_secs))
                    .min(duration)
                    .max(start);

                let segment = RecognizedSegment { start, end, text };
                if segment_tx.blocking_send(Ok(segment)).is_err() {
                    tracing::debug!("Segment consumer dropped; stopping decoding");
                    return Ok(());
                }
            }

            context.extend(decoded.tokens.iter().filter(|&&t| t < special.eot));
        }

        Ok(())
    }

    fn encode_window(&mut self, window: &[f32]) -> Result<Tensor, TranscriptionError> {
        let mut samples = window.to_vec();
        samples.resize(m::N_SAMPLES, 0.0);

        let mel = m::audio::pcm_to_mel(&self.config, &samples, &self.mel_filters);
        let n_mel = self.config.num_mel_bins;
        let n_frames = mel.len() / n_mel;

        let mel = Tensor::from_vec(mel, (1, n_mel, n_frames), &self.device)
            .and_then(|t| t.narrow(2, 0, n_frames.min(m::N_FRAMES)))
            .and_then(|t| t.to_dtype(self.dtype))
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("mel tensor: {}", e)))?;

        self.model
            .encoder
            .forward(&mel, true)
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("encoder: {}", e)))
    }

    fn last_logits(
        &mut self,
        tokens: &[u32],
        audio_features: &Tensor,
        flush: bool,
    ) -> candle_core::Result<Vec<f32>> {
        let tokens = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let hidden = self.model.decoder.forward(&tokens, audio_features, flush)?;
        let logits = self.model.decoder.final_linear(&hidden.squeeze(0)?)?;
        let seq_len = logits.dim(0)?;
        logits.get(seq_len - 1)?.to_dtype(DType::F32)?.to_vec1::<f32>()
    }

    fn detect_language(&mut self, audio_features: &Tensor) -> Result<&'static str, TranscriptionError> {
        let sot = self.special.sot;
        let logits = self
            .last_logits(&[sot], audio_features, true)
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("language: {}", e)))?;

        let detected = self
            .language_tokens
            .iter()
            .filter_map(|(code, id)| logits.get(*id as usize).map(|l| (*code, *l)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(code, _)| code)
            .ok_or_else(|| {
                TranscriptionError::TranscriptionFailed("no language tokens in vocabulary".into())
            })?;

        tracing::debug!(language = detected, "Language detected");
        Ok(detected)
    }
}

fn special_tokens(tokenizer: &Tokenizer) -> Result<SpecialTokens, TranscriptionError> {
    let required = |token: &str| {
        tokenizer
            .token_to_id(token)
            .ok_or_else(|| TranscriptionError::ModelLoadFailed(format!("token not found: {}", token)))
    };

    Ok(SpecialTokens {
        sot: required(m::SOT_TOKEN)?,
        eot: required(m::EOT_TOKEN)?,
        transcribe: required(m::TRANSCRIBE_TOKEN)?,
        no_timestamps: required(m::NO_TIMESTAMPS_TOKEN)?,
        start_of_prev: tokenizer.token_to_id("<|startofprev|>"),
        timestamp_begin: tokenizer.token_to_id("<|0.00|>"),
        no_speech: m::NO_SPEECH_TOKENS
            .iter()
            .find_map(|token| tokenizer.token_to_id(token)),
    })
}

fn load_failed(what: &str, err: impl std::fmt::Display) -> TranscriptionError {
    TranscriptionError::ModelLoadFailed(format!("{}: {}", what, err))
}
