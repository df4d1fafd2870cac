use candle_core::{DType, Device};

use tingxie::application::ports::{TranscriptionEngineLoader, TranscriptionError};
use tingxie::infrastructure::audio::{
    CandleWhisperEngine, ComputeType, TranscriptionEngineFactory, TranscriptionProvider,
};

#[test]
fn given_provider_names_when_parsing_then_provider_is_selected() {
    assert_eq!(
        "local".parse::<TranscriptionProvider>().unwrap(),
        TranscriptionProvider::Local
    );
    assert_eq!(
        "OpenAI".parse::<TranscriptionProvider>().unwrap(),
        TranscriptionProvider::OpenAi
    );
    assert!("azure".parse::<TranscriptionProvider>().is_err());
}

#[test]
fn given_compute_type_names_when_parsing_then_profile_is_selected() {
    assert_eq!("auto".parse::<ComputeType>().unwrap(), ComputeType::Auto);
    assert_eq!("float16".parse::<ComputeType>().unwrap(), ComputeType::F16);
    assert_eq!("bf16".parse::<ComputeType>().unwrap(), ComputeType::Bf16);
    assert!("int8".parse::<ComputeType>().is_err());
}

#[test]
fn given_cpu_device_when_selecting_dtype_then_auto_uses_f32() {
    assert_eq!(
        CandleWhisperEngine::select_dtype(&Device::Cpu, ComputeType::Auto),
        DType::F32
    );
    assert_eq!(
        CandleWhisperEngine::select_dtype(&Device::Cpu, ComputeType::F16),
        DType::F16
    );
}

#[tokio::test]
async fn given_openai_provider_without_key_when_loading_then_fails() {
    let factory = TranscriptionEngineFactory::new(TranscriptionProvider::OpenAi, "whisper-1")
        .with_api(Some("  ".to_string()), None);

    let result = factory.load().await;

    assert!(matches!(result, Err(TranscriptionError::ModelLoadFailed(_))));
}

#[tokio::test]
async fn given_openai_provider_with_key_when_loading_then_engine_is_built() {
    let factory = TranscriptionEngineFactory::new(TranscriptionProvider::OpenAi, "whisper-1")
        .with_api(Some("sk-test".to_string()), Some("http://localhost:9".to_string()));

    assert!(factory.load().await.is_ok());
    assert_eq!(factory.provider(), TranscriptionProvider::OpenAi);
}
