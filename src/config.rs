//! Recognizer configuration and validation.
//!
//! A [`RecognizerConfig`] is validated once, before any model or rule file is
//! touched; a config that fails [`RecognizerConfig::validate`] never produces
//! a recognizer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecognizerError, Result};

/// Feature extraction parameters (Kaldi FBank conventions).
///
/// Opaque to the decoding core; consumed by the feature extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub sample_rate: i32,
    pub feature_dim: usize,
    pub frame_length_ms: f32,
    pub frame_shift_ms: f32,
    pub low_freq: f32,
    /// Negative means nyquist + high_freq (Kaldi convention). -400 → 7600 Hz at 16kHz.
    pub high_freq: f32,
    pub preemph_coeff: f32,
    pub remove_dc_offset: bool,
    pub snip_edges: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            feature_dim: 80,
            frame_length_ms: 25.0,
            frame_shift_ms: 10.0,
            low_freq: 20.0,
            high_freq: -400.0,
            preemph_coeff: 0.97,
            remove_dc_offset: true,
            snip_edges: false,
        }
    }
}

impl FeatureConfig {
    pub fn window_size(&self) -> usize {
        (self.sample_rate as f32 * self.frame_length_ms / 1000.0) as usize
    }

    pub fn hop_size(&self) -> usize {
        (self.sample_rate as f32 * self.frame_shift_ms / 1000.0) as usize
    }

    pub fn frame_shift_seconds(&self) -> f32 {
        self.frame_shift_ms / 1000.0
    }
}

/// Model file locations and session parameters.
///
/// Opaque to the decoding core; consumed by the ONNX wrapper and the symbol
/// table loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the `.onnx` model file.
    pub model: PathBuf,
    /// Path to `tokens.txt`.
    pub tokens: PathBuf,
    pub num_threads: usize,
    pub debug: bool,
}

/// Closed enumeration of search strategies.
///
/// Serialized as the string values `greedy_search` / `modified_beam_search`.
/// Unknown strings fail at deserialization; they never degrade to greedy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodingMethod {
    #[default]
    #[serde(rename = "greedy_search")]
    GreedySearch,
    #[serde(rename = "modified_beam_search")]
    ModifiedBeamSearch,
}

impl fmt::Display for DecodingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingMethod::GreedySearch => write!(f, "greedy_search"),
            DecodingMethod::ModifiedBeamSearch => write!(f, "modified_beam_search"),
        }
    }
}

impl FromStr for DecodingMethod {
    type Err = RecognizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "greedy_search" => Ok(DecodingMethod::GreedySearch),
            "modified_beam_search" => Ok(DecodingMethod::ModifiedBeamSearch),
            other => Err(RecognizerError::Config(format!(
                "unknown decoding method '{}'",
                other
            ))),
        }
    }
}

/// Top-level offline recognizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub feat_config: FeatureConfig,
    pub model_config: ModelConfig,
    pub decoding_method: DecodingMethod,
    /// Number of parallel hypotheses kept per stream. Meaningful only for
    /// `modified_beam_search`.
    pub max_active_paths: usize,
    /// Optional hotwords file, one phrase per line. Compiled once at
    /// construction into the default biasing context shared by streams.
    pub hotwords_file: Option<PathBuf>,
    /// Additive log-space boost applied to hotword continuations.
    pub hotwords_score: f32,
    /// If false, hotword phrases must arrive as space-separated symbol-table
    /// entries (e.g. "▁I ▁LOVE ▁YOU") instead of natural-language text.
    pub tokenize_hotwords: bool,
    /// Subtracted from the blank class's log-probability at every frame.
    pub blank_penalty: f32,
    /// Rewrite rule files, applied to decoded text from left to right.
    pub rule_fsts: Vec<PathBuf>,
    /// Rewrite rule archives, applied after `rule_fsts`, left to right.
    pub rule_fars: Vec<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            feat_config: FeatureConfig::default(),
            model_config: ModelConfig::default(),
            decoding_method: DecodingMethod::GreedySearch,
            max_active_paths: 4,
            hotwords_file: None,
            hotwords_score: 1.5,
            tokenize_hotwords: true,
            blank_penalty: 0.0,
            rule_fsts: Vec::new(),
            rule_fars: Vec::new(),
        }
    }
}

impl RecognizerConfig {
    /// Read a config from a JSON file. Missing fields take their defaults;
    /// an unknown `decoding_method` string is a hard error.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Check the config for internal consistency.
    ///
    /// Path fields are only checked for existence here; content parsing
    /// belongs to the respective loaders.
    pub fn validate(&self) -> Result<()> {
        if self.feat_config.sample_rate <= 0 {
            return Err(RecognizerError::Config(format!(
                "sample_rate must be positive, got {}",
                self.feat_config.sample_rate
            )));
        }
        if self.feat_config.feature_dim == 0 {
            return Err(RecognizerError::Config(
                "feature_dim must be positive".to_string(),
            ));
        }
        if self.feat_config.frame_length_ms <= 0.0 || self.feat_config.frame_shift_ms <= 0.0 {
            return Err(RecognizerError::Config(format!(
                "frame_length_ms and frame_shift_ms must be positive, got {} / {}",
                self.feat_config.frame_length_ms, self.feat_config.frame_shift_ms
            )));
        }
        // Sub-millisecond shifts can still truncate to a zero-sample hop.
        if self.feat_config.window_size() == 0 || self.feat_config.hop_size() == 0 {
            return Err(RecognizerError::Config(format!(
                "frame timing too small for {} Hz: window {} samples, hop {} samples",
                self.feat_config.sample_rate,
                self.feat_config.window_size(),
                self.feat_config.hop_size()
            )));
        }

        if self.decoding_method == DecodingMethod::ModifiedBeamSearch && self.max_active_paths == 0
        {
            return Err(RecognizerError::Config(
                "max_active_paths must be positive for modified_beam_search".to_string(),
            ));
        }

        if !self.hotwords_score.is_finite() {
            return Err(RecognizerError::Config(format!(
                "hotwords_score must be finite, got {}",
                self.hotwords_score
            )));
        }
        if !self.blank_penalty.is_finite() {
            return Err(RecognizerError::Config(format!(
                "blank_penalty must be finite, got {}",
                self.blank_penalty
            )));
        }

        if let Some(path) = &self.hotwords_file {
            if !path.exists() {
                return Err(RecognizerError::Config(format!(
                    "hotwords_file not found: {}",
                    path.display()
                )));
            }
        }
        for path in self.rule_fsts.iter().chain(self.rule_fars.iter()) {
            if !path.exists() {
                return Err(RecognizerError::Config(format!(
                    "rewrite rule file not found: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}
