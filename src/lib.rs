//! # recognize-rs
//!
//! Offline (whole-utterance) speech recognition built around CTC acoustic
//! models. Utterances are fed into independent streams, decoded in batches
//! with a single model forward pass, optionally biased toward user-supplied
//! hotwords, and post-processed through an ordered chain of text rewrite
//! rules.
//!
//! ## Features
//!
//! - **Batched decoding**: any number of variable-length streams per call,
//!   one model invocation, order-preserving results
//! - **Hotword biasing**: `/`-separated phrases boost matching token
//!   continuations during the search
//! - **Selectable search**: greedy search today, modified beam search as an
//!   explicit placeholder that fails rather than silently degrading
//! - **Rewrite rules**: deterministic left-to-right text transformations
//!   loaded from rule files and archives
//! - **Pluggable models**: ONNX Runtime wrapper included; any
//!   [`AcousticModel`] implementation can be injected
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use recognize_rs::{OfflineRecognizer, RecognizerConfig, audio};
//!
//! let mut config = RecognizerConfig::default();
//! config.model_config.model = PathBuf::from("models/model.onnx");
//! config.model_config.tokens = PathBuf::from("models/tokens.txt");
//!
//! let mut recognizer = OfflineRecognizer::new(config)?;
//!
//! let samples = audio::read_wav_samples(&PathBuf::from("audio.wav"))?;
//! let mut stream = recognizer.create_stream();
//! stream.accept_waveform(16000, &samples)?;
//!
//! recognizer.decode_stream(&mut stream)?;
//! println!("{}", stream.result().unwrap().text);
//! # Ok::<(), recognize_rs::RecognizerError>(())
//! ```
//!
//! ## Audio Requirements
//!
//! Input WAV files must be 16 kHz, 16-bit PCM, mono.

pub mod audio;
pub mod config;
pub mod decoder;
pub mod features;
pub mod hotwords;
pub mod model;
pub mod rewrite;
pub mod stream;
pub mod vocab;

mod error;
mod recognizer;

pub use config::{DecodingMethod, FeatureConfig, ModelConfig, RecognizerConfig};
pub use error::{RecognizerError, Result, StreamFailure};
pub use hotwords::HotwordContext;
pub use model::{AcousticModel, ModelOutput, OnnxCtcModel};
pub use recognizer::OfflineRecognizer;
pub use stream::OfflineStream;
pub use vocab::SymbolTable;

/// The result of decoding one stream.
///
/// Written onto the stream by the recognizer; a subsequent decode of the same
/// stream overwrites it.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    /// Decoded text after rewrite rules.
    pub text: String,
    /// Symbol string for each decoded token.
    pub tokens: Vec<String>,
    /// Vocabulary ID for each decoded token.
    pub token_ids: Vec<i32>,
    /// Emission time of each token in seconds.
    pub timestamps: Vec<f32>,
    /// Log-probability of each token at its emission frame.
    pub scores: Vec<f32>,
}
