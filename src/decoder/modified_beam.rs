//! Modified beam search placeholder.

use ndarray::ArrayView2;

use crate::config::DecodingMethod;
use crate::error::{RecognizerError, Result};
use crate::hotwords::HotwordContext;

use super::{DecodedTokens, SearchDecoder};

/// Pruned multi-hypothesis search, keeping `max_active_paths` hypotheses per
/// stream with per-hypothesis hotword rescoring.
///
/// Not implemented yet. Selecting it fails every decode request with
/// `NotImplemented`; it never falls back to greedy search.
pub struct ModifiedBeamSearchDecoder {
    #[allow(dead_code)]
    max_active_paths: usize,
}

impl ModifiedBeamSearchDecoder {
    pub fn new(max_active_paths: usize) -> Self {
        Self { max_active_paths }
    }
}

impl SearchDecoder for ModifiedBeamSearchDecoder {
    fn method(&self) -> DecodingMethod {
        DecodingMethod::ModifiedBeamSearch
    }

    fn ensure_supported(&self) -> Result<()> {
        Err(RecognizerError::NotImplemented(
            DecodingMethod::ModifiedBeamSearch,
        ))
    }

    fn decode_batch(
        &self,
        batch: &[ArrayView2<f32>],
        _contexts: &[Option<&HotwordContext>],
    ) -> Vec<Result<DecodedTokens>> {
        batch
            .iter()
            .map(|_| {
                Err(RecognizerError::NotImplemented(
                    DecodingMethod::ModifiedBeamSearch,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_rejects_before_input_validation() {
        let decoder = ModifiedBeamSearchDecoder::new(4);
        assert!(matches!(
            decoder.ensure_supported(),
            Err(RecognizerError::NotImplemented(
                DecodingMethod::ModifiedBeamSearch
            ))
        ));
    }

    #[test]
    fn test_every_batch_entry_fails() {
        let decoder = ModifiedBeamSearchDecoder::new(4);
        let matrix = Array2::<f32>::zeros((5, 10));
        let results = decoder.decode_batch(&[matrix.view(), matrix.view()], &[None, None]);
        assert_eq!(results.len(), 2);
        for r in results {
            assert!(matches!(r, Err(RecognizerError::NotImplemented(_))));
        }
    }
}
