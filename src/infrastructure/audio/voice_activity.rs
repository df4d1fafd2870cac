use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::application::ports::TranscriptionError;

use super::audio_decoder::TARGET_SAMPLE_RATE;

const FRAME_MS: usize = 30;
const FRAME_LEN: usize = TARGET_SAMPLE_RATE as usize * FRAME_MS / 1000;
/// A window needs at least this much detected speech to be decoded.
const MIN_SPEECH_MS: usize = 300;

/// Per-frame voice decisions for 16 kHz mono PCM in `[-1, 1]`, 30 ms frames.
pub fn voiced_frames(pcm: &[f32]) -> Result<Vec<bool>, TranscriptionError> {
    let mut vad = Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, VadMode::Aggressive);

    let samples: Vec<i16> = pcm
        .iter()
        .map(|&v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();

    samples
        .chunks_exact(FRAME_LEN)
        .map(|frame| {
            vad.is_voice_segment(frame).map_err(|_| {
                TranscriptionError::DecodingFailed("voice activity detection failed".to_string())
            })
        })
        .collect()
}

/// For each window of `window_len` samples, whether it holds enough speech to decode.
pub fn voiced_windows(frames: &[bool], total_samples: usize, window_len: usize) -> Vec<bool> {
    let frames_per_window = window_len.div_ceil(FRAME_LEN).max(1);
    let min_frames = MIN_SPEECH_MS.div_ceil(FRAME_MS);
    let windows = total_samples.div_ceil(window_len);

    (0..windows)
        .map(|w| {
            let start = w * window_len / FRAME_LEN;
            let end = (start + frames_per_window).min(frames.len());
            let voiced = frames
                .get(start..end)
                .map(|slice| slice.iter().filter(|&&v| v).count())
                .unwrap_or(0);
            voiced >= min_frames
        })
        .collect()
}
