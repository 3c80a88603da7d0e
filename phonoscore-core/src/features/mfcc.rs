//! MFCC frontend.
//!
//! ## Parameters
//!
//! | Parameter       | Default             |
//! |-----------------|---------------------|
//! | Hann window     | `n_fft` samples     |
//! | FFT size        | 2048                |
//! | Hop length      | 512                 |
//! | Mel bands       | 128                 |
//! | Mel range       | 0 Hz – Nyquist      |
//! | dB floor        | max − 80 dB         |
//! | Coefficients    | 13 (DCT-II, ortho)  |
//! | c0              | dropped             |
//!
//! With an orthonormal DCT, a gain change moves every log-mel band by the
//! same number of dB, and the `top_db` floor moves with the maximum, so only
//! c0 changes. Dropping it (the default) makes the features level-invariant:
//! the 13 kept coefficients are c1..=c13. Set `include_c0` to get the
//! conventional c0..=c12 instead.
//!
//! Frames are centered: the signal is reflect-padded by `n_fft / 2` on both
//! sides, so a waveform of `len` samples yields `1 + len / hop` frames and
//! even a single sample produces one frame.
//!
//! Any change to these parameters shifts the scale of DTW scores, so the
//! engine's alignment ceiling has to be recalibrated alongside.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::debug;

use super::mel::{dct_basis, hann_window, mel_filters, reflect_pad};
use super::{FeatureExtractor, FeatureSequence};
use crate::audio::AudioWaveform;
use crate::error::{Result, ScoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct MfccConfig {
    /// Coefficients kept per frame. Default: 13.
    pub n_mfcc: usize,
    /// FFT / window length in samples. Default: 2048.
    pub n_fft: usize,
    /// Hop between frames in samples. Default: 512.
    pub hop_length: usize,
    /// Mel bands before the DCT. Default: 128.
    pub n_mels: usize,
    /// Lowest filter edge (Hz). Default: 0.
    pub fmin: f32,
    /// Highest filter edge (Hz). `None` means Nyquist.
    pub fmax: Option<f32>,
    /// Dynamic range kept below the loudest bin (dB). `None` disables the floor.
    pub top_db: Option<f32>,
    /// Keep the loudness coefficient c0. Default: false.
    pub include_c0: bool,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            top_db: Some(80.0),
            include_c0: false,
        }
    }
}

impl MfccConfig {
    /// Index of the first DCT row kept.
    fn first_coefficient(&self) -> usize {
        usize::from(!self.include_c0)
    }

    pub fn validate(&self) -> Result<()> {
        let max = self.n_mels - self.first_coefficient().min(self.n_mels);
        if self.n_mfcc == 0 || self.n_mfcc > max {
            return Err(ScoreError::InvalidConfig(format!(
                "n_mfcc must be in 1..={max} (got {})",
                self.n_mfcc
            )));
        }
        if self.n_fft < 2 || self.hop_length == 0 {
            return Err(ScoreError::InvalidConfig(
                "n_fft must be ≥ 2 and hop_length ≥ 1".into(),
            ));
        }
        if self.fmax.is_some_and(|f| f <= self.fmin) {
            return Err(ScoreError::InvalidConfig("fmax must exceed fmin".into()));
        }
        Ok(())
    }
}

/// Mel-frequency cepstral coefficients, one row per frame.
pub struct MfccExtractor {
    config: MfccConfig,
    sample_rate: u32,
    window: Vec<f32>,
    /// Filterbank for `sample_rate`; other rates build one per call.
    filters: Vec<Vec<f32>>,
    dct: Vec<Vec<f32>>,
    fft: Arc<dyn Fft<f32>>,
}

impl MfccExtractor {
    /// Build an extractor tuned for waveforms at `sample_rate`.
    pub fn new(config: MfccConfig, sample_rate: u32) -> Result<Self> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(ScoreError::InvalidConfig("sample rate must be positive".into()));
        }
        let window = hann_window(config.n_fft);
        let filters = Self::filters_for(&config, sample_rate);
        let first = config.first_coefficient();
        let dct = dct_basis(first + config.n_mfcc, config.n_mels)
            .into_iter()
            .skip(first)
            .collect();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.n_fft);

        Ok(Self {
            config,
            sample_rate,
            window,
            filters,
            dct,
            fft,
        })
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    fn filters_for(config: &MfccConfig, sample_rate: u32) -> Vec<Vec<f32>> {
        let nyquist = sample_rate as f32 / 2.0;
        let fmax = config.fmax.unwrap_or(nyquist).min(nyquist);
        mel_filters(config.n_fft, sample_rate, config.n_mels, config.fmin, fmax)
    }

    /// Mel power spectrogram in dB, frames × n_mels.
    fn log_mel(&self, samples: &[f32], filters: &[Vec<f32>]) -> Array2<f32> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_freqs = n_fft / 2 + 1;
        let padded = reflect_pad(samples, n_fft / 2);
        let n_frames = 1 + (padded.len() - n_fft) / hop;

        let mut mel = Array2::<f32>::zeros((n_frames, self.config.n_mels));
        let mut fft_buf = vec![Complex::new(0.0f32, 0.0); n_fft];

        for frame in 0..n_frames {
            let start = frame * hop;
            for (i, v) in fft_buf.iter_mut().enumerate() {
                *v = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.fft.process(&mut fft_buf);

            for (m, filter) in filters.iter().enumerate() {
                let mut energy = 0.0f32;
                for k in 0..n_freqs {
                    energy += filter[k] * fft_buf[k].norm_sqr();
                }
                mel[[frame, m]] = energy;
            }
        }

        mel.mapv_inplace(|v| 10.0 * v.max(1e-10).log10());
        if let Some(top_db) = self.config.top_db {
            let max_val = mel.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            mel.mapv_inplace(|v| v.max(max_val - top_db));
        }
        mel
    }
}

impl FeatureExtractor for MfccExtractor {
    fn extract(&self, waveform: &AudioWaveform) -> Result<FeatureSequence> {
        if waveform.is_empty() {
            return Err(ScoreError::EmptyInput);
        }

        let rebuilt;
        let filters = if waveform.sample_rate == self.sample_rate {
            &self.filters
        } else {
            debug!(
                expected = self.sample_rate,
                actual = waveform.sample_rate,
                "building mel filterbank for unexpected sample rate"
            );
            rebuilt = Self::filters_for(&self.config, waveform.sample_rate);
            &rebuilt
        };

        let mel = self.log_mel(&waveform.samples, filters);
        let n_frames = mel.nrows();
        let mut coeffs = Array2::<f32>::zeros((n_frames, self.config.n_mfcc));
        for (frame, mel_row) in mel.rows().into_iter().enumerate() {
            for (k, basis) in self.dct.iter().enumerate() {
                coeffs[[frame, k]] = basis.iter().zip(mel_row.iter()).map(|(b, x)| b * x).sum();
            }
        }

        FeatureSequence::new(coeffs)
    }

    fn dimension(&self) -> usize {
        self.config.n_mfcc
    }
}
