//! Audio sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! Learner recordings arrive at whatever rate the browser or microphone
//! produced (commonly 44.1 or 48 kHz) while reference audio comes from a TTS
//! voice at its own rate. MFCC frames are only comparable when both sides use
//! the same rate, so every waveform goes through `RateConverter` first.
//!
//! When source rate == target rate, `RateConverter` is a passthrough and no
//! rubato session is created at all.
//!
//! ## Usage
//!
//! ```ignore
//! let mut rc = RateConverter::new(48_000, 16_000, 1024)?;
//! let out = rc.convert(&waveform.samples)?; // Vec<f32> at 16 kHz
//! ```

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::audio::AudioWaveform;
use crate::error::{Result, ScoreError};

/// Input frame count per rubato call.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// How many input samples rubato expects per process call.
    chunk_size: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
    ratio: f64,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Errors
    /// Returns `ScoreError::Resample` if rubato fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 {
            return Err(ScoreError::Resample("sample rates must be positive".into()));
        }
        let ratio = target_rate as f64 / source_rate as f64;

        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                chunk_size,
                output_buf: Vec::new(),
                ratio,
            });
        }

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| ScoreError::Resample(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        debug!(source_rate, target_rate, chunk_size, max_out, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            chunk_size,
            output_buf,
            ratio,
        })
    }

    /// Convert a complete recording.
    ///
    /// The tail shorter than `chunk_size` is flushed with a partial call and
    /// the resampler's output delay is removed, so the result lines up with
    /// the input and has `round(len * ratio)` samples. Non-empty input never
    /// converts to nothing: at least one sample comes back.
    pub fn convert(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(samples.to_vec());
        };
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let expected = ((samples.len() as f64 * self.ratio).round() as usize).max(1);
        let delay = resampler.output_delay();
        let mut out = Vec::with_capacity(expected + delay);
        let map_err = |e: rubato::ResampleError| ScoreError::Resample(e.to_string());

        let mut chunks = samples.chunks_exact(self.chunk_size);
        for chunk in chunks.by_ref() {
            let (_, produced) = resampler
                .process_into_buffer(&[chunk], &mut self.output_buf, None)
                .map_err(map_err)?;
            out.extend_from_slice(&self.output_buf[0][..produced]);
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let (_, produced) = resampler
                .process_partial_into_buffer(Some(&[tail][..]), &mut self.output_buf, None)
                .map_err(map_err)?;
            out.extend_from_slice(&self.output_buf[0][..produced]);
        }

        // Push zeros through until the delayed tail has been emitted.
        while out.len() < expected + delay {
            let (_, produced) = resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut self.output_buf, None)
                .map_err(map_err)?;
            if produced == 0 {
                break;
            }
            out.extend_from_slice(&self.output_buf[0][..produced]);
        }

        let start = delay.min(out.len());
        let end = (start + expected).min(out.len());
        let mut converted = out[start..end].to_vec();
        if converted.len() < expected {
            // Hold the last value over the few samples rubato could not emit.
            let fill = converted.last().or(samples.last()).copied().unwrap_or(0.0);
            converted.resize(expected, fill);
        }
        Ok(converted)
    }

    /// Returns `true` when source rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

/// Bring `waveform` to `target_rate` as a new waveform.
pub fn to_rate(waveform: &AudioWaveform, target_rate: u32) -> Result<AudioWaveform> {
    if waveform.sample_rate == target_rate {
        return Ok(waveform.clone());
    }
    let mut rc = RateConverter::new(waveform.sample_rate, target_rate, DEFAULT_CHUNK_SIZE)?;
    let samples = rc.convert(&waveform.samples)?;
    AudioWaveform::new(samples, target_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_identity() {
        let mut rc = RateConverter::new(16_000, 16_000, 960).unwrap();
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let out = rc.convert(&samples).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn ratio_48k_to_16k_correct_length() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(!rc.is_passthrough());
        // 4800 input samples at 48 kHz → 1600 at 16 kHz
        let samples = vec![0.0f32; 4_800];
        let out = rc.convert(&samples).unwrap();
        assert!(
            (out.len() as isize - 1_600).unsigned_abs() <= 10,
            "output len={} expected≈1600",
            out.len()
        );
    }

    #[test]
    fn short_tail_is_flushed() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        // Fewer than chunk_size samples still produce output.
        let out = rc.convert(&vec![0.25f32; 500]).unwrap();
        assert!(!out.is_empty(), "partial chunk should be flushed");
    }

    #[test]
    fn single_sample_survives_downsampling() {
        let mut rc = RateConverter::new(48_000, 16_000, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(rc.convert(&[0.3]).unwrap().len(), 1);
        assert!(rc.convert(&[]).unwrap().is_empty());

        let w = AudioWaveform::new(vec![0.3, -0.3], 48_000).unwrap();
        let out = to_rate(&w, 16_000).unwrap();
        assert_eq!(out.samples.len(), 1);
        assert!(out.samples[0].is_finite());
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(matches!(
            RateConverter::new(0, 16_000, 960),
            Err(ScoreError::Resample(_))
        ));
    }

    #[test]
    fn to_rate_relabels_sample_rate() {
        let w = AudioWaveform::new(vec![0.1; 2_205], 22_050).unwrap();
        let out = to_rate(&w, 16_000).unwrap();
        assert_eq!(out.sample_rate, 16_000);
        assert!((out.samples.len() as isize - 1_600).unsigned_abs() <= 10);
    }
}
