use std::path::PathBuf;

use recognize_rs::{audio, OfflineRecognizer, RecognizerConfig};

#[test]
fn test_onnx_decode() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let model_dir = PathBuf::from("models/zipformer-ctc");
    let wav_path = PathBuf::from("samples/test.wav");

    if !model_dir.join("model.onnx").exists() {
        eprintln!("Skipping test: model not found at {:?}", model_dir);
        return Ok(());
    }
    if !wav_path.exists() {
        eprintln!("Skipping test: audio not found at {:?}", wav_path);
        return Ok(());
    }

    let mut config = RecognizerConfig::default();
    config.model_config.model = model_dir.join("model.onnx");
    config.model_config.tokens = model_dir.join("tokens.txt");

    let mut recognizer = OfflineRecognizer::new(config)?;

    let samples = audio::read_wav_samples(&wav_path)?;
    let mut stream = recognizer.create_stream();
    stream.accept_waveform(16000, &samples)?;

    recognizer.decode_stream(&mut stream)?;

    let result = stream.result().expect("decode produced no result");
    assert!(!result.text.is_empty(), "decoded text should not be empty");
    assert_eq!(result.tokens.len(), result.timestamps.len());

    Ok(())
}
