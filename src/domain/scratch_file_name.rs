use std::fmt;

use uuid::Uuid;

const FALLBACK_STEM: &str = "upload";

/// On-disk name for a request's transient upload: `<uuid>_<sanitized client name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchFileName(String);

impl ScratchFileName {
    pub fn new(suggested: &str) -> Self {
        Self::with_id(Uuid::new_v4(), suggested)
    }

    pub fn with_id(id: Uuid, suggested: &str) -> Self {
        Self(format!("{}_{}", id, sanitize(suggested)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScratchFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keeps the last path component, maps anything outside `[A-Za-z0-9._-]` to `_` and
/// preserves an alphanumeric extension.
pub fn sanitize(suggested: &str) -> String {
    let base = suggested.rsplit(['/', '\\']).next().unwrap_or_default();

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (base, None),
    };

    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches(['.', '_']);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    let extension: String = extension
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}
