//! Acoustic model boundary.
//!
//! The decoding core only sees the [`AcousticModel`] trait: a batch of
//! feature matrices goes in, frame-level log-probabilities over the
//! vocabulary come out. [`OnnxCtcModel`] is the ONNX Runtime implementation
//! for offline CTC models; tests and embedders can inject
//! their own implementation through
//! [`OfflineRecognizer::with_model`](crate::OfflineRecognizer::with_model).

use std::path::Path;

use ndarray::{Array1, Array3, ArrayView2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use crate::config::ModelConfig;
use crate::error::{RecognizerError, Result};

/// Batched forward-pass output.
pub struct ModelOutput {
    /// `[N, T', V]` log-probabilities.
    pub log_probs: Array3<f32>,
    /// Valid output-frame count per batch row, each <= T'.
    pub lengths: Vec<usize>,
}

/// Frame-synchronous acoustic model over a token vocabulary.
pub trait AcousticModel: Send {
    /// Run one forward pass over a batch of `[T_i, C]` feature matrices.
    /// Padding and batch assembly are the implementation's concern.
    fn forward_batch(&mut self, features: &[ArrayView2<f32>]) -> Result<ModelOutput>;

    /// ID of the CTC blank class. Typically 0.
    fn blank_id(&self) -> i32 {
        0
    }

    /// Ratio of input feature frames to output probability frames, used to
    /// convert output-frame timestamps back to input time.
    fn subsampling_factor(&self) -> usize {
        4
    }
}

/// ONNX Runtime wrapper for offline CTC models.
///
/// Expected graph I/O: inputs `x` `[N, T, C]` and `x_lens` `[N]`, outputs
/// `log_probs` `[N, T', V]` and `log_probs_len` `[N]`. Names are discovered
/// with positional fallback. The session owns its allocator; no process-wide
/// tensor state is involved.
pub struct OnnxCtcModel {
    session: Session,
    x_input_name: String,
    x_lens_input_name: String,
    log_probs_output_name: String,
    log_probs_len_output_name: String,
    blank_id: i32,
    subsampling_factor: usize,
}

impl Drop for OnnxCtcModel {
    fn drop(&mut self) {
        log::debug!("Dropping OnnxCtcModel");
    }
}

impl OnnxCtcModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        if !config.model.exists() {
            return Err(RecognizerError::Config(format!(
                "model file not found: {}",
                config.model.display()
            )));
        }

        log::info!("Loading CTC model from {:?}...", config.model);
        let session = Self::init_session(&config.model, config.num_threads, config.debug)?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        if input_names.is_empty() || output_names.is_empty() {
            return Err(RecognizerError::Config(
                "model has no inputs or outputs".to_string(),
            ));
        }

        // Streaming models carry cached_* state inputs and need chunked
        // input with state management; this wrapper is offline-only.
        if input_names.iter().any(|n| n.starts_with("cached_")) {
            return Err(RecognizerError::Config(
                "this is a streaming model (has cached_* state inputs); \
                 use an offline (non-streaming) model instead"
                    .to_string(),
            ));
        }

        let x_input_name = input_names
            .iter()
            .find(|n| n.as_str() == "x")
            .cloned()
            .unwrap_or_else(|| input_names[0].clone());

        let x_lens_input_name = input_names
            .iter()
            .find(|n| n.as_str() == "x_lens")
            .or_else(|| input_names.iter().find(|n| n.contains("lens")))
            .cloned()
            .unwrap_or_else(|| {
                if input_names.len() > 1 {
                    input_names[1].clone()
                } else {
                    input_names[0].clone()
                }
            });

        let log_probs_output_name = output_names
            .iter()
            .find(|n| n.as_str() == "log_probs")
            .cloned()
            .unwrap_or_else(|| output_names[0].clone());

        let log_probs_len_output_name = output_names
            .iter()
            .find(|n| n.as_str() == "log_probs_len")
            .cloned()
            .unwrap_or_else(|| {
                if output_names.len() > 1 {
                    output_names[1].clone()
                } else {
                    output_names[0].clone()
                }
            });

        log::info!(
            "CTC model I/O: x='{}', x_lens='{}', log_probs='{}', log_probs_len='{}'",
            x_input_name,
            x_lens_input_name,
            log_probs_output_name,
            log_probs_len_output_name
        );

        let (blank_id, subsampling_factor) = Self::read_metadata(&session);

        Ok(Self {
            session,
            x_input_name,
            x_lens_input_name,
            log_probs_output_name,
            log_probs_len_output_name,
            blank_id,
            subsampling_factor,
        })
    }

    /// Read `blank_id` / `subsampling_factor` from the model's custom
    /// metadata, falling back to the usual CTC defaults (0 / 4) when a key is
    /// absent or unparsable.
    fn read_metadata(session: &Session) -> (i32, usize) {
        let mut blank_id = 0i32;
        let mut subsampling_factor = 4usize;

        if let Ok(metadata) = session.metadata() {
            let custom = |key: &str| metadata.custom(key).ok().flatten();

            match custom("blank_id").as_deref().map(parse_metadata_int) {
                Some(Some(id)) if id >= 0 => {
                    blank_id = id as i32;
                    log::info!("Model metadata: blank_id={}", blank_id);
                }
                Some(_) => log::warn!("Ignoring unparsable blank_id in model metadata"),
                None => log::debug!("No blank_id in model metadata, using {}", blank_id),
            }

            match custom("subsampling_factor")
                .as_deref()
                .map(parse_metadata_int)
            {
                Some(Some(f)) if f > 0 => {
                    subsampling_factor = f as usize;
                    log::info!("Model metadata: subsampling_factor={}", subsampling_factor);
                }
                Some(_) => {
                    log::warn!("Ignoring unparsable subsampling_factor in model metadata")
                }
                None => log::debug!(
                    "No subsampling_factor in model metadata, using {}",
                    subsampling_factor
                ),
            }
        }

        (blank_id, subsampling_factor)
    }

    fn init_session(path: &Path, num_threads: usize, debug: bool) -> Result<Session> {
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .with_parallel_execution(true)?;

        if num_threads > 0 {
            builder = builder.with_intra_threads(num_threads)?;
        }

        let session = builder.commit_from_file(path)?;

        if debug {
            for input in &session.inputs {
                log::info!("Model input: name={}, type={:?}", input.name, input.input_type);
            }
            for output in &session.outputs {
                log::info!(
                    "Model output: name={}, type={:?}",
                    output.name,
                    output.output_type
                );
            }
        }
        Ok(session)
    }

    /// Zero-pad variable-length feature matrices into one `[N, maxT, C]` batch.
    fn assemble_batch(features: &[ArrayView2<f32>]) -> Result<(Array3<f32>, Array1<i64>)> {
        let feat_dim = features[0].ncols();
        let max_frames = features.iter().map(|f| f.nrows()).max().unwrap_or(0);

        let mut batch = Array3::<f32>::zeros((features.len(), max_frames, feat_dim));
        let mut lens = Array1::<i64>::zeros(features.len());

        for (n, feat) in features.iter().enumerate() {
            if feat.ncols() != feat_dim {
                return Err(RecognizerError::InvalidInput(format!(
                    "feature dim mismatch in batch: {} vs {}",
                    feat.ncols(),
                    feat_dim
                )));
            }
            batch
                .slice_mut(ndarray::s![n, ..feat.nrows(), ..])
                .assign(feat);
            lens[n] = feat.nrows() as i64;
        }

        Ok((batch, lens))
    }
}

impl AcousticModel for OnnxCtcModel {
    fn forward_batch(&mut self, features: &[ArrayView2<f32>]) -> Result<ModelOutput> {
        if features.is_empty() {
            return Err(RecognizerError::InvalidInput(
                "empty feature batch".to_string(),
            ));
        }

        let (batch, lens) = Self::assemble_batch(features)?;
        log::debug!(
            "Forward pass: batch shape {:?}, lens {:?}",
            batch.shape(),
            lens.as_slice()
        );

        let batch_dyn = batch.into_dyn();
        let lens_dyn = lens.into_dyn();

        let inputs = inputs![
            self.x_input_name.as_str() => TensorRef::from_array_view(batch_dyn.view())?,
            self.x_lens_input_name.as_str() => TensorRef::from_array_view(lens_dyn.view())?,
        ];

        let outputs = self.session.run(inputs)?;

        let log_probs = outputs
            .get(self.log_probs_output_name.as_str())
            .ok_or_else(|| {
                RecognizerError::InvalidInput(format!(
                    "model output '{}' not found",
                    self.log_probs_output_name
                ))
            })?
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<ndarray::Ix3>()?;

        let max_out_frames = log_probs.shape()[1];

        let lengths: Vec<usize> =
            match outputs.get(self.log_probs_len_output_name.as_str()) {
                Some(v) => match v.try_extract_array::<i64>() {
                    Ok(arr) => arr
                        .iter()
                        .map(|&l| (l.max(0) as usize).min(max_out_frames))
                        .collect(),
                    Err(_) => vec![max_out_frames; features.len()],
                },
                None => vec![max_out_frames; features.len()],
            };

        Ok(ModelOutput { log_probs, lengths })
    }

    fn blank_id(&self) -> i32 {
        self.blank_id
    }

    fn subsampling_factor(&self) -> usize {
        self.subsampling_factor
    }
}

/// Parse an integer metadata value; exported values sometimes carry
/// surrounding whitespace.
fn parse_metadata_int(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata_int() {
        assert_eq!(parse_metadata_int("2"), Some(2));
        assert_eq!(parse_metadata_int(" 4 "), Some(4));
        assert_eq!(parse_metadata_int("0"), Some(0));
        assert_eq!(parse_metadata_int(""), None);
        assert_eq!(parse_metadata_int("four"), None);
        assert_eq!(parse_metadata_int("4.0"), None);
    }
}
