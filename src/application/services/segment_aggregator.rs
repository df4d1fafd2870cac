use futures::StreamExt;

use crate::application::ports::{
    RecognitionInfo, RecognizedSegment, ScriptConversionError, SegmentStream, TranscriptionError,
};
use crate::domain::{ConversionProfile, Segment, TranscriptionResult, round_to_hundredths};

use super::script_normalizer::ScriptNormalizer;

const JOIN_SEPARATOR: &str = " ";

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("segment stream failed after {segments} segments: {source}")]
    Stream {
        segments: usize,
        #[source]
        source: TranscriptionError,
    },
    #[error("script normalization failed on segment {index}: {source}")]
    Normalization {
        index: usize,
        #[source]
        source: ScriptConversionError,
    },
}

/// Folds the engine's segment stream into a [`TranscriptionResult`].
///
/// The stream is always drained to its end. The first failure (engine error item or
/// normalization error) is kept and reported once the stream is exhausted.
pub struct SegmentAggregator<'a> {
    normalization: Option<(&'a ScriptNormalizer, ConversionProfile)>,
    segments: Vec<Segment>,
    full_text: String,
    first_error: Option<AggregationError>,
}

impl<'a> SegmentAggregator<'a> {
    pub fn new(normalization: Option<(&'a ScriptNormalizer, ConversionProfile)>) -> Self {
        Self {
            normalization,
            segments: Vec::new(),
            full_text: String::new(),
            first_error: None,
        }
    }

    pub async fn aggregate(
        mut self,
        info: RecognitionInfo,
        mut stream: SegmentStream,
    ) -> Result<TranscriptionResult, AggregationError> {
        while let Some(item) = stream.next().await {
            match item {
                Ok(segment) => self.push(segment),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        segments = self.segments.len(),
                        "Segment stream yielded an error"
                    );
                    if self.first_error.is_none() {
                        self.first_error = Some(AggregationError::Stream {
                            segments: self.segments.len(),
                            source: e,
                        });
                    }
                }
            }
        }

        self.finish(info)
    }

    pub fn push(&mut self, raw: RecognizedSegment) {
        let index = self.segments.len();
        let trimmed = raw.text.trim();

        let text = match self.normalization {
            Some((normalizer, profile)) => match normalizer.normalize(trimmed, profile) {
                Ok(converted) => converted,
                Err(e) => {
                    if self.first_error.is_none() {
                        self.first_error = Some(AggregationError::Normalization { index, source: e });
                    }
                    trimmed.to_string()
                }
            },
            None => trimmed.to_string(),
        };

        if index > 0 {
            self.full_text.push_str(JOIN_SEPARATOR);
        }
        self.full_text.push_str(&text);
        self.segments.push(Segment::new(raw.start, raw.end, text));
    }

    pub fn finish(self, info: RecognitionInfo) -> Result<TranscriptionResult, AggregationError> {
        if let Some(e) = self.first_error {
            return Err(e);
        }

        tracing::debug!(
            segments = self.segments.len(),
            chars = self.full_text.chars().count(),
            "Segments aggregated"
        );

        Ok(TranscriptionResult {
            language: info.language,
            duration: round_to_hundredths(info.duration),
            full_text: self.full_text.trim().to_string(),
            segments: self.segments,
        })
    }
}
