use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    /// Builds a reported segment; timestamps are rounded to two decimals and clamped so
    /// that `0 <= start <= end`.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        let start = round_to_hundredths(start.max(0.0));
        let end = round_to_hundredths(end.max(0.0)).max(start);
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Two-decimal rounding, half away from zero.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
