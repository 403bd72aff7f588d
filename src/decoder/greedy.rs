//! CTC greedy search with optional hotword biasing.

use ndarray::ArrayView2;

use crate::config::DecodingMethod;
use crate::error::{RecognizerError, Result};
use crate::hotwords::{HotwordContext, PhraseMatcher};

use super::{DecodedTokens, SearchDecoder};

/// Per-frame argmax with CTC collapsing.
///
/// At each frame the token with the highest adjusted score wins; comparison
/// is strict, so the lowest token ID wins ties. Blanks are dropped and
/// consecutive repeats collapsed. When a biasing context is present, tokens
/// that start a hotword phrase or continue a matched prefix get the context's
/// score added before the comparison; recorded per-token scores stay
/// unboosted.
pub struct GreedySearchDecoder {
    blank_id: i32,
    num_classes: usize,
}

impl GreedySearchDecoder {
    pub fn new(blank_id: i32, num_classes: usize) -> Self {
        Self {
            blank_id,
            num_classes,
        }
    }

    fn decode_one(
        &self,
        log_probs: &ArrayView2<f32>,
        context: Option<&HotwordContext>,
    ) -> Result<DecodedTokens> {
        let num_frames = log_probs.nrows();
        if num_frames == 0 {
            return Err(RecognizerError::InvalidInput(
                "probability matrix has zero frames".to_string(),
            ));
        }
        if log_probs.ncols() != self.num_classes {
            return Err(RecognizerError::InvalidInput(format!(
                "probability matrix has {} classes, model has {}",
                log_probs.ncols(),
                self.num_classes
            )));
        }

        let biasing = context.filter(|c| !c.is_empty());
        let mut matcher = biasing.map(PhraseMatcher::new);

        let mut result = DecodedTokens {
            tokens: Vec::new(),
            timestamps: Vec::new(),
            scores: Vec::new(),
        };
        let mut prev_id: Option<i32> = None;

        for t in 0..num_frames {
            let boosted = matcher.as_ref().map(|m| m.boosted());
            let boost = biasing.map(|c| c.score).unwrap_or(0.0);

            let mut max_id = 0i32;
            let mut max_val = f32::NEG_INFINITY;
            for v in 0..self.num_classes {
                let mut val = log_probs[[t, v]];
                if let Some(set) = &boosted {
                    if set.contains(&(v as i32)) {
                        val += boost;
                    }
                }
                if val > max_val {
                    max_val = val;
                    max_id = v as i32;
                }
            }

            if max_id != self.blank_id && Some(max_id) != prev_id {
                result.tokens.push(max_id);
                result.timestamps.push(t);
                result.scores.push(log_probs[[t, max_id as usize]]);
                if let Some(m) = matcher.as_mut() {
                    m.advance(max_id);
                }
            }
            prev_id = Some(max_id);
        }

        Ok(result)
    }
}

impl SearchDecoder for GreedySearchDecoder {
    fn method(&self) -> DecodingMethod {
        DecodingMethod::GreedySearch
    }

    fn ensure_supported(&self) -> Result<()> {
        Ok(())
    }

    fn decode_batch(
        &self,
        batch: &[ArrayView2<f32>],
        contexts: &[Option<&HotwordContext>],
    ) -> Vec<Result<DecodedTokens>> {
        batch
            .iter()
            .enumerate()
            .map(|(i, matrix)| self.decode_one(matrix, contexts.get(i).copied().flatten()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    fn decoder() -> GreedySearchDecoder {
        GreedySearchDecoder::new(0, 4)
    }

    #[test]
    fn test_ctc_collapse() {
        // Frames: blank, 1, 1, blank, 2, 2, 1
        let probs = arr2(&[
            [0.9f32, 0.1, 0.0, 0.0],
            [0.1, 0.9, 0.0, 0.0],
            [0.1, 0.9, 0.0, 0.0],
            [0.9, 0.1, 0.0, 0.0],
            [0.0, 0.1, 0.9, 0.0],
            [0.0, 0.1, 0.9, 0.0],
            [0.1, 0.9, 0.0, 0.0],
        ]);
        let result = decoder().decode_one(&probs.view(), None).unwrap();
        assert_eq!(result.tokens, vec![1, 2, 1]);
        assert_eq!(result.timestamps, vec![1, 4, 6]);
        assert_eq!(result.scores, vec![0.9, 0.9, 0.9]);
    }

    #[test]
    fn test_tie_breaks_to_lowest_id() {
        let probs = arr2(&[[0.0f32, 0.5, 0.5, 0.0]]);
        let result = decoder().decode_one(&probs.view(), None).unwrap();
        assert_eq!(result.tokens, vec![1]);
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let probs = Array2::<f32>::zeros((0, 4));
        assert!(matches!(
            decoder().decode_one(&probs.view(), None),
            Err(RecognizerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_class_count_mismatch_rejected() {
        let probs = Array2::<f32>::zeros((3, 7));
        assert!(matches!(
            decoder().decode_one(&probs.view(), None),
            Err(RecognizerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_hotword_boost_flips_close_contest() {
        // Token 2 narrowly beats token 1 at every frame.
        let probs = arr2(&[[0.0f32, 0.45, 0.55, 0.0], [0.9, 0.0, 0.05, 0.0]]);
        let context = HotwordContext {
            phrases: vec![vec![1]],
            score: 0.2,
        };

        let unbiased = decoder().decode_one(&probs.view(), None).unwrap();
        assert_eq!(unbiased.tokens, vec![2]);

        let biased = decoder()
            .decode_one(&probs.view(), Some(&context))
            .unwrap();
        assert_eq!(biased.tokens, vec![1]);
        // Recorded score is the unboosted log-probability.
        assert_eq!(biased.scores, vec![0.45]);
    }

    #[test]
    fn test_zero_score_context_matches_unbiased() {
        let probs = arr2(&[[0.0f32, 0.45, 0.55, 0.0], [0.9, 0.0, 0.05, 0.0]]);
        let context = HotwordContext {
            phrases: vec![vec![1]],
            score: 0.0,
        };
        let unbiased = decoder().decode_one(&probs.view(), None).unwrap();
        let biased = decoder()
            .decode_one(&probs.view(), Some(&context))
            .unwrap();
        assert_eq!(unbiased, biased);
    }

    #[test]
    fn test_batch_failures_are_isolated() {
        let good = arr2(&[[0.0f32, 0.9, 0.0, 0.0]]);
        let bad = Array2::<f32>::zeros((0, 4));
        let results = decoder().decode_batch(&[good.view(), bad.view()], &[None, None]);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_determinism() {
        let probs = arr2(&[
            [0.2f32, 0.3, 0.4, 0.1],
            [0.4, 0.1, 0.3, 0.2],
            [0.1, 0.1, 0.1, 0.7],
        ]);
        let a = decoder().decode_one(&probs.view(), None).unwrap();
        let b = decoder().decode_one(&probs.view(), None).unwrap();
        assert_eq!(a, b);
    }
}
