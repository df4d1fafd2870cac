use zhconv::{Variant, zhconv};

use crate::application::ports::{ScriptConversionError, ScriptConverter};
use crate::domain::ConversionProfile;

/// Simplified to Traditional (Taiwan) conversion backed by the MediaWiki tables in
/// `zhconv`. `Characters` uses the generic Traditional table, `Phrases` adds the Taiwan
/// regional vocabulary on top of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZhconvConverter;

impl ZhconvConverter {
    pub fn new() -> Self {
        Self
    }

    fn variant(profile: ConversionProfile) -> Variant {
        match profile {
            ConversionProfile::Characters => Variant::ZhHant,
            ConversionProfile::Phrases => Variant::ZhTW,
        }
    }
}

impl ScriptConverter for ZhconvConverter {
    fn convert(
        &self,
        text: &str,
        profile: ConversionProfile,
    ) -> Result<String, ScriptConversionError> {
        if text.is_empty() {
            return Ok(String::new());
        }
        Ok(zhconv(text, Self::variant(profile)))
    }
}
