//! Per-utterance stream state.

use ndarray::{Array2, ArrayView2};

use crate::error::{RecognizerError, Result};
use crate::features::FeatureExtractor;
use crate::hotwords::HotwordContext;
use crate::RecognitionResult;

/// One utterance being accumulated for decoding.
///
/// A stream owns its feature buffer, an optional hotword biasing context, and
/// the result of the most recent decode. Streams are created by
/// [`OfflineRecognizer`](crate::OfflineRecognizer) and fed by exactly one
/// logical caller; `&mut` access enforces that at compile time.
pub struct OfflineStream {
    extractor: FeatureExtractor,
    feature_dim: usize,
    /// Row-major [num_frames, feature_dim] buffer.
    features: Vec<f32>,
    num_frames: usize,
    hotwords: Option<HotwordContext>,
    result: Option<RecognitionResult>,
}

impl std::fmt::Debug for OfflineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineStream")
            .field("feature_dim", &self.feature_dim)
            .field("num_frames", &self.num_frames)
            .field("hotwords", &self.hotwords)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl OfflineStream {
    pub(crate) fn new(extractor: FeatureExtractor, hotwords: Option<HotwordContext>) -> Self {
        let feature_dim = extractor.feature_dim();
        Self {
            extractor,
            feature_dim,
            features: Vec::new(),
            num_frames: 0,
            hotwords,
            result: None,
        }
    }

    /// Append pre-extracted feature frames.
    pub fn accept_features(&mut self, features: ArrayView2<f32>) -> Result<()> {
        if features.ncols() != self.feature_dim {
            return Err(RecognizerError::InvalidInput(format!(
                "feature dim mismatch: stream expects {}, got {}",
                self.feature_dim,
                features.ncols()
            )));
        }
        self.num_frames += features.nrows();
        self.features.extend(features.iter().copied());
        Ok(())
    }

    /// Extract features from raw samples and append them.
    pub fn accept_waveform(&mut self, sample_rate: i32, samples: &[f32]) -> Result<()> {
        if sample_rate != self.extractor.sample_rate() {
            return Err(RecognizerError::InvalidInput(format!(
                "sample rate mismatch: stream expects {} Hz, got {} Hz",
                self.extractor.sample_rate(),
                sample_rate
            )));
        }
        let features = self.extractor.extract(samples);
        self.accept_features(features.view())
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// View of the accumulated `[num_frames, feature_dim]` matrix.
    pub fn features(&self) -> ArrayView2<f32> {
        ArrayView2::from_shape((self.num_frames, self.feature_dim), &self.features)
            .unwrap_or_else(|_| ArrayView2::from_shape((0, self.feature_dim), &[]).unwrap())
    }

    /// Owned copy of the feature matrix.
    pub fn features_owned(&self) -> Array2<f32> {
        self.features().to_owned()
    }

    pub fn hotwords(&self) -> Option<&HotwordContext> {
        self.hotwords.as_ref()
    }

    /// Result of the most recent decode, if any.
    pub fn result(&self) -> Option<&RecognitionResult> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<RecognitionResult> {
        self.result.take()
    }

    pub(crate) fn set_result(&mut self, result: RecognitionResult) {
        self.result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use ndarray::Array2;

    fn stream() -> OfflineStream {
        let config = FeatureConfig {
            feature_dim: 4,
            ..Default::default()
        };
        OfflineStream::new(FeatureExtractor::new(&config), None)
    }

    #[test]
    fn test_accept_features_accumulates() {
        let mut s = stream();
        assert_eq!(s.num_frames(), 0);

        s.accept_features(Array2::zeros((3, 4)).view()).unwrap();
        s.accept_features(Array2::ones((2, 4)).view()).unwrap();
        assert_eq!(s.num_frames(), 5);
        assert_eq!(s.features().shape(), &[5, 4]);
        assert_eq!(s.features()[[4, 0]], 1.0);
    }

    #[test]
    fn test_feature_dim_mismatch_rejected() {
        let mut s = stream();
        let err = s.accept_features(Array2::zeros((3, 7)).view()).unwrap_err();
        assert!(matches!(err, RecognizerError::InvalidInput(_)));
        assert_eq!(s.num_frames(), 0);
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let mut s = stream();
        assert!(matches!(
            s.accept_waveform(8000, &[0.0; 800]),
            Err(RecognizerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_take_result_clears() {
        let mut s = stream();
        s.set_result(RecognitionResult {
            text: "hi".to_string(),
            tokens: vec![],
            token_ids: vec![],
            timestamps: vec![],
            scores: vec![],
        });
        assert!(s.result().is_some());
        let taken = s.take_result().unwrap();
        assert_eq!(taken.text, "hi");
        assert!(s.result().is_none());
    }
}
