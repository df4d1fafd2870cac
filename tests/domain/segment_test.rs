use tingxie::domain::{Segment, round_to_hundredths};

#[test]
fn given_long_fractions_when_rounding_then_two_decimals_remain() {
    assert_eq!(round_to_hundredths(1.004), 1.0);
    assert_eq!(round_to_hundredths(2.006), 2.01);
    assert_eq!(round_to_hundredths(3.0), 3.0);
}

#[test]
fn given_raw_times_when_creating_segment_then_times_are_rounded() {
    let segment = Segment::new(1.004, 2.006, "hello");

    assert_eq!(segment.start, 1.0);
    assert_eq!(segment.end, 2.01);
    assert_eq!(segment.text, "hello");
}

#[test]
fn given_end_before_start_when_creating_segment_then_end_is_clamped() {
    let segment = Segment::new(2.0, 1.0, "x");

    assert_eq!(segment.start, 2.0);
    assert_eq!(segment.end, 2.0);
}

#[test]
fn given_negative_start_when_creating_segment_then_start_is_zero() {
    let segment = Segment::new(-0.3, 0.5, "x");

    assert_eq!(segment.start, 0.0);
    assert_eq!(segment.end, 0.5);
}

#[test]
fn given_segment_when_serializing_then_fields_match_response_shape() {
    let json = serde_json::to_value(Segment::new(0.0, 1.5, "你好")).unwrap();

    assert_eq!(json, serde_json::json!({"start": 0.0, "end": 1.5, "text": "你好"}));
}
