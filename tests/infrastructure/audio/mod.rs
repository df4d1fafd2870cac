mod engine_factory_test;
mod voice_activity_test;
mod whisper_decoder_test;
