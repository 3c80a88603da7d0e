//! Energy gate that trims leading and trailing silence.
//!
//! ## Algorithm
//!
//! 1. Split the waveform into fixed frames (`frame_ms`, default 20 ms).
//! 2. A frame is voiced when its RMS ≥ `threshold`.
//! 3. Keep everything from the first voiced frame through the last one,
//!    plus `hangover_frames` of context on each side (prevents clipping
//!    soft onsets and word endings).
//! 4. If no frame is voiced the waveform is returned unchanged.
//!
//! DTW has no notion of "silence to skip": leading dead air in one recording
//! but not the other is paid for frame by frame, so trimming happens before
//! feature extraction.

use crate::audio::AudioWaveform;

/// A simple energy-based silence trimmer.
#[derive(Debug, Clone)]
pub struct SilenceTrimmer {
    /// RMS amplitude threshold. Frames above this are considered speech.
    /// Typical range: 0.005–0.05 for a close microphone.
    threshold: f32,
    /// Frame length in milliseconds.
    frame_ms: u32,
    /// Frames of context kept around the voiced region.
    hangover_frames: usize,
}

impl SilenceTrimmer {
    pub fn new(threshold: f32, frame_ms: u32, hangover_frames: usize) -> Self {
        Self {
            threshold,
            frame_ms: frame_ms.max(1),
            hangover_frames,
        }
    }

    /// Return the voiced span of `waveform`.
    pub fn trim(&self, waveform: &AudioWaveform) -> AudioWaveform {
        let frame_len = (waveform.sample_rate as usize * self.frame_ms as usize / 1_000).max(1);
        let voiced: Vec<bool> = waveform
            .samples
            .chunks(frame_len)
            .map(|frame| rms(frame) >= self.threshold)
            .collect();

        let (Some(first), Some(last)) = (
            voiced.iter().position(|&v| v),
            voiced.iter().rposition(|&v| v),
        ) else {
            return waveform.clone();
        };

        let start_frame = first.saturating_sub(self.hangover_frames);
        let end_frame = (last + 1 + self.hangover_frames).min(voiced.len());
        let start = start_frame * frame_len;
        let end = (end_frame * frame_len).min(waveform.samples.len());

        AudioWaveform {
            samples: waveform.samples[start..end].to_vec(),
            sample_rate: waveform.sample_rate,
        }
    }
}

impl Default for SilenceTrimmer {
    fn default() -> Self {
        Self::new(0.01, 20, 2)
    }
}

/// Compute the root-mean-square of a sample slice.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
