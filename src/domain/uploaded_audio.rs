use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct UploadedAudio {
    pub filename: Option<String>,
    pub data: Bytes,
}

impl UploadedAudio {
    pub fn new(filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename,
            data: data.into(),
        }
    }

    /// Lowercased substring after the last `.`, if the filename has one.
    pub fn extension(&self) -> Option<String> {
        let filename = self.filename.as_deref()?;
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}
