use std::sync::Arc;

use crate::application::ports::{ScriptConversionError, ScriptConverter};
use crate::domain::ConversionProfile;

const CHINESE_LANGUAGE_CODES: [&str; 1] = ["zh"];

#[derive(Clone)]
pub struct ScriptNormalizer {
    converter: Arc<dyn ScriptConverter>,
}

impl ScriptNormalizer {
    pub fn new(converter: Arc<dyn ScriptConverter>) -> Self {
        Self { converter }
    }

    /// Whether text recognized in `language` is written in a script the tables cover.
    pub fn applies_to(&self, language: &str) -> bool {
        CHINESE_LANGUAGE_CODES
            .iter()
            .any(|code| code.eq_ignore_ascii_case(language.trim()))
    }

    pub fn normalize(
        &self,
        text: &str,
        profile: ConversionProfile,
    ) -> Result<String, ScriptConversionError> {
        self.converter.convert(text, profile)
    }
}
