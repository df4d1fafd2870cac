use tingxie::infrastructure::audio::voice_activity::{voiced_frames, voiced_windows};

#[test]
fn given_silence_when_detecting_voice_then_no_frame_is_voiced() {
    let silence = vec![0.0f32; 16_000];

    let frames = voiced_frames(&silence).unwrap();

    assert_eq!(frames.len(), 33);
    assert!(frames.iter().all(|v| !v));
}

#[test]
fn given_voiced_frames_when_grouping_windows_then_each_window_is_judged() {
    let window_len = 480 * 20;
    let mut frames = vec![false; 20];
    frames.extend(vec![true; 20]);

    let windows = voiced_windows(&frames, window_len * 2, window_len);

    assert_eq!(windows, vec![false, true]);
}

#[test]
fn given_trailing_partial_window_without_frames_when_grouping_then_it_is_silent() {
    let window_len = 480 * 20;
    let frames = vec![true; 40];

    let windows = voiced_windows(&frames, window_len * 2 + 100, window_len);

    assert_eq!(windows, vec![true, true, false]);
}

#[test]
fn given_brief_speech_when_grouping_windows_then_window_is_silent() {
    let window_len = 480 * 20;
    let mut frames = vec![false; 20];
    frames[3] = true;
    frames[4] = true;

    let windows = voiced_windows(&frames, window_len, window_len);

    assert_eq!(windows, vec![false]);
}
