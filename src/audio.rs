//! WAV file reading.

use std::path::Path;

use crate::error::{RecognizerError, Result};

/// Read a WAV file into normalized f32 samples in [-1.0, 1.0].
///
/// The file must be 16 kHz, 16-bit PCM, mono.
pub fn read_wav_samples(path: &Path) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_rate != 16000 {
        return Err(RecognizerError::InvalidInput(format!(
            "expected 16 kHz sample rate, got {} Hz in {}",
            spec.sample_rate,
            path.display()
        )));
    }
    if spec.channels != 1 {
        return Err(RecognizerError::InvalidInput(format!(
            "expected mono audio, got {} channels in {}",
            spec.channels,
            path.display()
        )));
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(RecognizerError::InvalidInput(format!(
            "expected 16-bit PCM samples in {}",
            path.display()
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<std::result::Result<Vec<f32>, _>>()?;

    log::debug!(
        "Read {} samples ({:.2}s) from {:?}",
        samples.len(),
        samples.len() as f32 / 16000.0,
        path
    );
    Ok(samples)
}
