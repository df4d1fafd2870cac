use crate::domain::UploadedAudio;

pub const DEFAULT_AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "ogg", "flac", "m4a", "webm"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("No file selected")]
    EmptyFilename,
    #[error("Unsupported file format. Supported formats: {supported}")]
    UnsupportedExtension { supported: String },
}

/// Cheap checks on an upload, run before anything is written or loaded.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new<I, S>(allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for ext in allowed_extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !allowed.contains(&ext) {
                allowed.push(ext);
            }
        }
        Self {
            allowed_extensions: allowed,
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn validate<'a>(
        &self,
        upload: Option<&'a UploadedAudio>,
    ) -> Result<&'a UploadedAudio, ValidationError> {
        let upload = upload.ok_or(ValidationError::MissingFile)?;

        match upload.filename.as_deref() {
            None | Some("") => return Err(ValidationError::EmptyFilename),
            Some(_) => {}
        }

        match upload.extension() {
            Some(ext) if self.allowed_extensions.contains(&ext) => Ok(upload),
            _ => Err(ValidationError::UnsupportedExtension {
                supported: self.allowed_extensions.join(", "),
            }),
        }
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIO_EXTENSIONS)
    }
}
