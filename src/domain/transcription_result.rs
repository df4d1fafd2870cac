use super::segment::Segment;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub language: String,
    pub duration: f64,
    pub full_text: String,
    pub segments: Vec<Segment>,
}
