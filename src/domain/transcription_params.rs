use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

pub const DEFAULT_BEAM_SIZE: u32 = 5;

/// Conversion table used when rewriting Simplified script to Traditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversionProfile {
    /// Character-by-character mapping.
    Characters,
    /// Character mapping plus regional vocabulary for multi-character terms.
    #[default]
    Phrases,
}

impl ConversionProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionProfile::Characters => "characters",
            ConversionProfile::Phrases => "phrases",
        }
    }
}

impl fmt::Display for ConversionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamSize(NonZeroU32);

impl BeamSize {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for BeamSize {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_BEAM_SIZE - 1))
    }
}

impl FromStr for BeamSize {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParameterError::InvalidBeamSize(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("beam_size must be a positive integer, got '{0}'")]
    InvalidBeamSize(String),
}

/// Form values exactly as the client sent them.
#[derive(Debug, Clone, Default)]
pub struct RawTranscriptionParams {
    pub language: Option<String>,
    pub beam_size: Option<String>,
    pub to_traditional: Option<String>,
    pub phrase_conversion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionParams {
    pub language: Option<String>,
    pub beam_size: BeamSize,
    pub normalize_script: bool,
    pub conversion_profile: ConversionProfile,
}

impl Default for TranscriptionParams {
    fn default() -> Self {
        Self {
            language: None,
            beam_size: BeamSize::default(),
            normalize_script: true,
            conversion_profile: ConversionProfile::default(),
        }
    }
}

impl TryFrom<RawTranscriptionParams> for TranscriptionParams {
    type Error = ParameterError;

    fn try_from(raw: RawTranscriptionParams) -> Result<Self, Self::Error> {
        let language = raw
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("auto"));

        let beam_size = match raw.beam_size.as_deref() {
            Some(value) => value.parse()?,
            None => BeamSize::default(),
        };

        let conversion_profile = if flag_or_true(raw.phrase_conversion.as_deref()) {
            ConversionProfile::Phrases
        } else {
            ConversionProfile::Characters
        };

        Ok(Self {
            language,
            beam_size,
            normalize_script: flag_or_true(raw.to_traditional.as_deref()),
            conversion_profile,
        })
    }
}

/// Absent means `true`; otherwise only a case-insensitive `"true"` enables the flag.
fn flag_or_true(value: Option<&str>) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(true)
}
