use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use tingxie::application::services::{
    EngineHandle, ScriptNormalizer, TranscriptionService, TranscriptionServiceConfig,
    UploadValidator,
};
use tingxie::infrastructure::audio::{ComputeType, TranscriptionEngineFactory, TranscriptionProvider};
use tingxie::infrastructure::conversion::ZhconvConverter;
use tingxie::infrastructure::observability::{TracingConfig, init_tracing};
use tingxie::infrastructure::storage::LocalTransientStore;
use tingxie::presentation::config::TranscriptionSettings;
use tingxie::presentation::{AppState, Environment, Settings, TranscriptionProviderSetting, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load configuration")?;

    init_tracing(&TracingConfig::new(
        environment.as_str(),
        settings.logging.json || TracingConfig::default().json_format,
        settings.logging.directives.as_deref(),
    ))?;

    tracing::info!(
        environment = %environment,
        provider = ?settings.transcription.provider,
        model = %settings.transcription.model,
        "Configuration loaded"
    );

    let store = Arc::new(
        LocalTransientStore::new(PathBuf::from(&settings.upload.scratch_dir))
            .context("Failed to prepare scratch directory")?,
    );
    let engine = Arc::new(EngineHandle::new(
        Arc::new(engine_factory(&settings.transcription)?),
        settings.transcription.max_concurrent_inferences,
    ));
    let normalizer = ScriptNormalizer::new(Arc::new(ZhconvConverter::new()));

    let transcription_service = Arc::new(TranscriptionService::new(
        UploadValidator::new(&settings.upload.allowed_extensions),
        store,
        engine,
        normalizer,
        TranscriptionServiceConfig {
            vad_filter: settings.transcription.vad_filter,
            inference_timeout: Duration::from_secs(settings.transcription.inference_timeout_secs),
        },
    ));

    let router = create_router(
        AppState::new(transcription_service),
        Path::new(&settings.server.static_dir),
        settings.upload.max_body_bytes(),
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

fn engine_factory(settings: &TranscriptionSettings) -> anyhow::Result<TranscriptionEngineFactory> {
    let provider = match settings.provider {
        TranscriptionProviderSetting::Local => TranscriptionProvider::Local,
        TranscriptionProviderSetting::OpenAi => TranscriptionProvider::OpenAi,
    };
    let compute_type: ComputeType = settings.compute_type.parse()?;

    Ok(TranscriptionEngineFactory::new(provider, &settings.model)
        .with_compute_type(compute_type)
        .with_api(
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
        ))
}
