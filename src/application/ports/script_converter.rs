use crate::domain::ConversionProfile;

/// Rewrites Simplified Chinese into a Traditional rendering using immutable tables.
pub trait ScriptConverter: Send + Sync {
    fn convert(&self, text: &str, profile: ConversionProfile)
    -> Result<String, ScriptConversionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptConversionError {
    #[error("conversion table unavailable: {0}")]
    TableUnavailable(String),
    #[error("conversion failed: {0}")]
    ConversionFailed(String),
}
