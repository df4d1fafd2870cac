use tingxie::domain::{ScratchFileName, sanitize};
use uuid::Uuid;

#[test]
fn given_plain_name_when_sanitizing_then_name_is_kept() {
    assert_eq!(sanitize("meeting-notes_01.mp3"), "meeting-notes_01.mp3");
}

#[test]
fn given_path_components_when_sanitizing_then_only_file_name_remains() {
    assert_eq!(sanitize("../../etc/passwd"), "passwd");
    assert_eq!(sanitize("C:\\Users\\me\\voice memo.m4a"), "voice_memo.m4a");
    assert_eq!(sanitize("../../a b.MP3"), "a_b.MP3");
}

#[test]
fn given_non_ascii_stem_when_sanitizing_then_extension_survives() {
    assert_eq!(sanitize("錄音.mp3"), "upload.mp3");
}

#[test]
fn given_empty_name_when_sanitizing_then_falls_back() {
    assert_eq!(sanitize(""), "upload");
    assert_eq!(sanitize("..."), "upload");
}

#[test]
fn given_fixed_id_when_building_scratch_name_then_id_prefixes_sanitized_name() {
    let id = Uuid::nil();
    let name = ScratchFileName::with_id(id, "my clip.wav");

    assert_eq!(
        name.as_str(),
        "00000000-0000-0000-0000-000000000000_my_clip.wav"
    );
    assert_eq!(name.to_string(), name.as_str());
}

#[test]
fn given_same_suggestion_when_building_twice_then_names_differ() {
    let first = ScratchFileName::new("clip.wav");
    let second = ScratchFileName::new("clip.wav");

    assert_ne!(first, second);
    assert!(first.as_str().ends_with("_clip.wav"));
}
