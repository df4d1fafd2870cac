use tingxie::application::ports::ScriptConverter;
use tingxie::domain::ConversionProfile;
use tingxie::infrastructure::conversion::ZhconvConverter;

#[test]
fn given_simplified_term_when_converting_with_phrases_then_taiwan_vocabulary_is_used() {
    let converter = ZhconvConverter::new();

    let converted = converter.convert("软件", ConversionProfile::Phrases).unwrap();

    assert_eq!(converted, "軟體");
}

#[test]
fn given_simplified_term_when_converting_with_characters_then_only_characters_change() {
    let converter = ZhconvConverter::new();

    let converted = converter
        .convert("软件", ConversionProfile::Characters)
        .unwrap();

    assert_eq!(converted, "軟件");
}

#[test]
fn given_empty_text_when_converting_then_empty() {
    let converter = ZhconvConverter::new();

    assert_eq!(converter.convert("", ConversionProfile::Phrases).unwrap(), "");
}

#[test]
fn given_latin_text_when_converting_then_unchanged() {
    let converter = ZhconvConverter::new();

    let converted = converter
        .convert("Hello, world 123", ConversionProfile::Phrases)
        .unwrap();

    assert_eq!(converted, "Hello, world 123");
}

#[test]
fn given_traditional_text_when_converting_then_idempotent() {
    let converter = ZhconvConverter::new();

    let once = converter
        .convert("我们今天讨论网络安全", ConversionProfile::Phrases)
        .unwrap();
    let twice = converter.convert(&once, ConversionProfile::Phrases).unwrap();

    assert_eq!(once, twice);
}
