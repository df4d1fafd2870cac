const DEFAULT_DIRECTIVES: &str = "info,tingxie=debug,tower_http=debug";

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub directives: String,
}

impl TracingConfig {
    pub fn new(environment: impl Into<String>, json_format: bool, directives: Option<&str>) -> Self {
        Self {
            environment: environment.into(),
            json_format,
            directives: directives
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(DEFAULT_DIRECTIVES)
                .to_string(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new(
            std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "Local".to_string()),
            std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
            None,
        )
    }
}
