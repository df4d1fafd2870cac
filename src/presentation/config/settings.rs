use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment as EnvironmentSource, File};
use serde::Deserialize;

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub upload: UploadSettings,
    pub transcription: TranscriptionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub scratch_dir: String,
    pub max_file_size_mb: usize,
    pub allowed_extensions: Vec<String>,
}

impl UploadSettings {
    pub fn max_body_bytes(&self) -> usize {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProviderSetting,
    pub model: String,
    pub compute_type: String,
    pub vad_filter: bool,
    pub inference_timeout_secs: u64,
    pub max_concurrent_inferences: usize,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProviderSetting {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub json: bool,
    #[serde(default)]
    pub directives: Option<String>,
}

impl Settings {
    /// Defaults, then `appsettings.{Environment}` if present, then `APP_` variables
    /// (`APP_TRANSCRIPTION__MODEL=...`).
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Self::builder(environment)?.build()?.try_deserialize()
    }

    pub fn builder(environment: Environment) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = Self::defaults()?
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                EnvironmentSource::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_extensions")
                    .try_parsing(true),
            );
        Ok(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.static_dir", "static")?
            .set_default("upload.scratch_dir", "uploads")?
            .set_default("upload.max_file_size_mb", 100)?
            .set_default(
                "upload.allowed_extensions",
                vec!["mp3", "wav", "ogg", "flac", "m4a", "webm"],
            )?
            .set_default("transcription.provider", "local")?
            .set_default("transcription.model", "openai/whisper-large-v3-turbo")?
            .set_default("transcription.compute_type", "auto")?
            .set_default("transcription.vad_filter", true)?
            .set_default("transcription.inference_timeout_secs", 600)?
            .set_default("transcription.max_concurrent_inferences", 1)?
            .set_default("logging.json", false)
    }
}
