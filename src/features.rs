//! Kaldi-compatible log-mel FBank feature extraction.
//!
//! Matches kaldi-native-fbank defaults: Povey window (hamming^0.85),
//! DC-offset removal, preemphasis, triangular mel filterbank, natural log,
//! and snip_edges=false frame centering. The window, filterbank, and FFT plan
//! are computed once per extractor.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::FeatureConfig;

#[derive(Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    fft_size: usize,
    window: Vec<f32>,
    filterbank: Vec<Vec<f32>>,
    fft: Arc<dyn Fft<f32>>,
}

impl FeatureExtractor {
    pub fn new(config: &FeatureConfig) -> Self {
        let window_size = config.window_size();
        let fft_size = window_size.next_power_of_two();

        // Povey window: hamming^0.85
        let window: Vec<f32> = (0..window_size)
            .map(|i| {
                let hamming = 0.54
                    - 0.46
                        * (2.0 * std::f32::consts::PI * i as f32 / (window_size as f32 - 1.0))
                            .cos();
                hamming.powf(0.85)
            })
            .collect();

        let filterbank = compute_mel_filterbank(config, fft_size);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        Self {
            config: config.clone(),
            fft_size,
            window,
            filterbank,
            fft,
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.config.feature_dim
    }

    pub fn sample_rate(&self) -> i32 {
        self.config.sample_rate
    }

    /// Extract a `[num_frames, feature_dim]` log-mel matrix from mono samples.
    pub fn extract(&self, samples: &[f32]) -> Array2<f32> {
        let window_size = self.config.window_size();
        let hop_size = self.config.hop_size();
        let half_fft = self.fft_size / 2 + 1;
        let num_bins = self.config.feature_dim;

        if samples.is_empty() {
            return Array2::zeros((0, num_bins));
        }

        // Frame count: snip_edges=false pads the signal
        let num_frames = if self.config.snip_edges {
            if samples.len() < window_size {
                return Array2::zeros((0, num_bins));
            }
            (samples.len() - window_size) / hop_size + 1
        } else {
            (samples.len() + hop_size / 2) / hop_size
        };

        if num_frames == 0 {
            return Array2::zeros((0, num_bins));
        }

        let mut features = Vec::with_capacity(num_frames * num_bins);

        for frame_idx in 0..num_frames {
            let center = if self.config.snip_edges {
                frame_idx * hop_size + window_size / 2
            } else {
                frame_idx * hop_size
            };
            let start = center as isize - (window_size as isize / 2);

            // Extract frame with zero-padding at boundaries
            let mut frame = vec![0.0f32; window_size];
            for (i, slot) in frame.iter_mut().enumerate() {
                let idx = start + i as isize;
                if idx >= 0 && (idx as usize) < samples.len() {
                    *slot = samples[idx as usize];
                }
            }

            if self.config.remove_dc_offset {
                let mean: f32 = frame.iter().sum::<f32>() / window_size as f32;
                for s in frame.iter_mut() {
                    *s -= mean;
                }
            }

            if self.config.preemph_coeff > 0.0 {
                for i in (1..window_size).rev() {
                    frame[i] -= self.config.preemph_coeff * frame[i - 1];
                }
                frame[0] *= 1.0 - self.config.preemph_coeff;
            }

            // Window, zero-pad to FFT size, transform
            let mut buffer: Vec<Complex<f32>> = frame
                .iter()
                .zip(self.window.iter())
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

            self.fft.process(&mut buffer);

            let mut power = vec![0.0f32; half_fft];
            for (i, c) in buffer.iter().take(half_fft).enumerate() {
                power[i] = c.norm_sqr();
            }

            // Mel filterbank + natural log (Kaldi convention)
            for filter in &self.filterbank {
                let mut sum = 0.0f32;
                for (i, &w) in filter.iter().enumerate() {
                    sum += w * power[i];
                }
                features.push(if sum > f32::EPSILON {
                    sum.ln()
                } else {
                    f32::EPSILON.ln()
                });
            }
        }

        Array2::from_shape_vec((num_frames, num_bins), features)
            .unwrap_or_else(|_| Array2::zeros((0, num_bins)))
    }
}

fn compute_mel_filterbank(config: &FeatureConfig, fft_size: usize) -> Vec<Vec<f32>> {
    let num_bins = config.feature_dim;
    let sample_rate = config.sample_rate as f32;
    let nyquist = sample_rate / 2.0;

    // Kaldi convention: negative high_freq means nyquist + high_freq
    let low_freq = config.low_freq;
    let high_freq = if config.high_freq <= 0.0 {
        nyquist + config.high_freq
    } else {
        config.high_freq
    };

    let hz_to_mel = |hz: f32| 1127.0 * (1.0 + hz / 700.0).ln();
    let mel_to_hz = |mel: f32| 700.0 * ((mel / 1127.0).exp() - 1.0);

    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);

    let num_points = num_bins + 2;
    let mel_points: Vec<f32> = (0..num_points)
        .map(|i| low_mel + (high_mel - low_mel) * i as f32 / (num_points - 1) as f32)
        .collect();
    let fft_bins: Vec<usize> = mel_points
        .iter()
        .map(|&m| ((mel_to_hz(m) * fft_size as f32) / sample_rate).floor() as usize)
        .collect();

    let half_fft = fft_size / 2 + 1;
    let mut filterbank = vec![vec![0.0f32; half_fft]; num_bins];
    for (i, filter) in filterbank.iter_mut().enumerate() {
        let left = fft_bins[i];
        let center = fft_bins[i + 1];
        let right = fft_bins[i + 2];

        if center > left {
            for j in left..center {
                if j < half_fft {
                    filter[j] = (j - left) as f32 / (center - left) as f32;
                }
            }
        }
        if right > center {
            for j in center..right {
                if j < half_fft {
                    filter[j] = (right - j) as f32 / (right - center) as f32;
                }
            }
        }
    }

    filterbank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_zero_frames() {
        let extractor = FeatureExtractor::new(&FeatureConfig::default());
        let features = extractor.extract(&[]);
        assert_eq!(features.shape(), &[0, 80]);
    }

    #[test]
    fn test_frame_count_matches_hop_arithmetic() {
        let config = FeatureConfig::default();
        let extractor = FeatureExtractor::new(&config);

        // One second at 16 kHz, snip_edges=false: (16000 + 80) / 160 frames.
        let samples = vec![0.1f32; 16000];
        let features = extractor.extract(&samples);
        assert_eq!(features.nrows(), (16000 + 160 / 2) / 160);
        assert_eq!(features.ncols(), 80);
    }

    #[test]
    fn test_snip_edges_frame_count() {
        let config = FeatureConfig {
            snip_edges: true,
            ..Default::default()
        };
        let extractor = FeatureExtractor::new(&config);
        let samples = vec![0.1f32; 16000];
        let features = extractor.extract(&samples);
        assert_eq!(features.nrows(), (16000 - 400) / 160 + 1);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(&FeatureConfig::default());
        let samples: Vec<f32> = (0..3200).map(|i| ((i as f32) * 0.01).sin()).collect();
        let a = extractor.extract(&samples);
        let b = extractor.extract(&samples);
        assert_eq!(a, b);
    }
}
