use tingxie::domain::UploadedAudio;

#[test]
fn given_mixed_case_extension_when_reading_extension_then_lowercased() {
    let audio = UploadedAudio::new(Some("Voice.MP3".to_string()), &b"abc"[..]);

    assert_eq!(audio.extension().as_deref(), Some("mp3"));
    assert_eq!(audio.size_bytes(), 3);
}

#[test]
fn given_name_without_extension_when_reading_extension_then_none() {
    let audio = UploadedAudio::new(Some("recording".to_string()), Vec::new());

    assert_eq!(audio.extension(), None);
}

#[test]
fn given_no_filename_when_reading_extension_then_none() {
    let audio = UploadedAudio::new(None, Vec::new());

    assert_eq!(audio.extension(), None);
}
