//! Search decoders operating on per-frame log-probability matrices.
//!
//! Each [`DecodingMethod`] variant has one disjoint [`SearchDecoder`]
//! implementation; unsupported variants reject at `ensure_supported` instead
//! of silently degrading to another strategy.

mod greedy;
mod modified_beam;

pub use greedy::GreedySearchDecoder;
pub use modified_beam::ModifiedBeamSearchDecoder;

use ndarray::{s, Array3, ArrayView2};

use crate::config::{DecodingMethod, RecognizerConfig};
use crate::error::Result;
use crate::hotwords::HotwordContext;

/// Raw decode output for one stream, before symbol mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTokens {
    pub tokens: Vec<i32>,
    /// Output-frame index at which each token was emitted.
    pub timestamps: Vec<usize>,
    /// Log-probability of each emitted token, without any hotword boost.
    pub scores: Vec<f32>,
}

/// One search strategy over a batch of frame-probability matrices.
pub trait SearchDecoder: Send {
    fn method(&self) -> DecodingMethod;

    /// Reject unimplemented strategies up front, before any input is looked
    /// at. Called once per decode request, so even an empty batch fails.
    fn ensure_supported(&self) -> Result<()>;

    /// Decode each `[T, V]` matrix into a token sequence.
    ///
    /// Returns one entry per input matrix in the same order. Per-stream
    /// success and failure are independent: a malformed matrix fails its own
    /// slot and leaves the rest of the batch untouched.
    fn decode_batch(
        &self,
        batch: &[ArrayView2<f32>],
        contexts: &[Option<&HotwordContext>],
    ) -> Vec<Result<DecodedTokens>>;
}

/// Build the decoder for the configured method.
pub fn new_decoder(
    config: &RecognizerConfig,
    blank_id: i32,
    num_classes: usize,
) -> Box<dyn SearchDecoder> {
    match config.decoding_method {
        DecodingMethod::GreedySearch => {
            Box::new(GreedySearchDecoder::new(blank_id, num_classes))
        }
        DecodingMethod::ModifiedBeamSearch => {
            Box::new(ModifiedBeamSearchDecoder::new(config.max_active_paths))
        }
    }
}

/// Subtract `penalty` from the blank class's log-probability at every frame
/// of every batch row. A zero penalty is an identity and returns without
/// touching the array.
pub fn apply_blank_penalty(log_probs: &mut Array3<f32>, blank_id: i32, penalty: f32) {
    if penalty == 0.0 {
        return;
    }
    let blank = blank_id as usize;
    if blank >= log_probs.shape()[2] {
        return;
    }
    log_probs
        .slice_mut(s![.., .., blank])
        .mapv_inplace(|v| v - penalty);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_blank_penalty_zero_is_identity() {
        let mut probs = Array3::from_shape_fn((2, 3, 4), |(n, t, v)| (n + t + v) as f32);
        let before = probs.clone();
        apply_blank_penalty(&mut probs, 0, 0.0);
        assert_eq!(probs, before);
    }

    #[test]
    fn test_blank_penalty_hits_only_blank_column() {
        let mut probs = Array3::zeros((2, 3, 4));
        apply_blank_penalty(&mut probs, 1, 0.5);
        for n in 0..2 {
            for t in 0..3 {
                for v in 0..4 {
                    let expected = if v == 1 { -0.5 } else { 0.0 };
                    assert_eq!(probs[[n, t, v]], expected);
                }
            }
        }
    }

    #[test]
    fn test_new_decoder_dispatches_on_method() {
        let config = RecognizerConfig::default();
        assert_eq!(
            new_decoder(&config, 0, 10).method(),
            DecodingMethod::GreedySearch
        );

        let config = RecognizerConfig {
            decoding_method: DecodingMethod::ModifiedBeamSearch,
            ..Default::default()
        };
        assert_eq!(
            new_decoder(&config, 0, 10).method(),
            DecodingMethod::ModifiedBeamSearch
        );
    }
}
