//! Decoded audio and the decoding seam.
//!
//! The engine only ever sees an [`AudioWaveform`]: mono f32 samples at a known
//! rate. Getting there from a file or upload is the job of an
//! [`AudioDecoder`]; [`WavDecoder`] is the bundled `hound` implementation.
//!
//! Before feature extraction the engine brings every waveform to one rate
//! ([`resample`]) and optionally trims leading/trailing silence ([`trim`]).

pub mod resample;
pub mod trim;

use std::path::Path;

use tracing::debug;

use crate::error::{Result, ScoreError};

/// A contiguous block of mono PCM samples at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioWaveform {
    /// Mono f32 samples, nominally in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 44100, 48000).
    pub sample_rate: u32,
}

impl AudioWaveform {
    /// Build a waveform, rejecting a zero sample rate or an empty buffer.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ScoreError::Decode("sample rate must be positive".into()));
        }
        if samples.is_empty() {
            return Err(ScoreError::EmptyInput);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Returns the duration of this waveform in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Returns true if the waveform contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Contract for turning a stored recording into samples.
pub trait AudioDecoder: Send + Sync {
    /// # Errors
    /// `ScoreError::Decode` when the source is not readable audio,
    /// `ScoreError::EmptyInput` when it decodes to zero samples.
    fn decode(&self, path: &Path) -> Result<AudioWaveform>;
}

/// RIFF/WAVE decoder backed by `hound`. Multi-channel input is mixed to mono.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, path: &Path) -> Result<AudioWaveform> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| ScoreError::Decode(format!("{}: {e}", path.display())))?;
        let waveform = read_wav_mono_f32(reader)?;
        debug!(
            path = %path.display(),
            samples = waveform.samples.len(),
            sample_rate = waveform.sample_rate,
            "decoded wav"
        );
        Ok(waveform)
    }
}

impl WavDecoder {
    /// Decode an in-memory WAV blob (e.g. an HTTP upload).
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<AudioWaveform> {
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes))
            .map_err(|e| ScoreError::Decode(e.to_string()))?;
        read_wav_mono_f32(reader)
    }
}

fn read_wav_mono_f32<R: std::io::Read>(mut reader: hound::WavReader<R>) -> Result<AudioWaveform> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let decode_err = |e: hound::Error| ScoreError::Decode(e.to_string());

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map_err(decode_err))
            .collect::<Result<Vec<_>>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample <= 16 {
                reader
                    .samples::<i16>()
                    .map(|s| s.map(|v| v as f32 / i16::MAX as f32).map_err(decode_err))
                    .collect::<Result<Vec<_>>>()?
            } else {
                let max = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max).map_err(decode_err))
                    .collect::<Result<Vec<_>>>()?
            }
        }
    };

    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().copied().sum::<f32>() / channels as f32)
            .collect()
    };

    AudioWaveform::new(mono, spec.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn new_rejects_empty_and_zero_rate() {
        assert!(matches!(
            AudioWaveform::new(vec![], 16_000),
            Err(ScoreError::EmptyInput)
        ));
        assert!(matches!(
            AudioWaveform::new(vec![0.1], 0),
            Err(ScoreError::Decode(_))
        ));
    }

    #[test]
    fn duration_matches_rate() {
        let w = AudioWaveform::new(vec![0.0; 8_000], 16_000).unwrap();
        assert!((w.duration_secs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, &[i16::MAX, 0, i16::MAX, 0]);

        let w = WavDecoder.decode(&path).unwrap();
        assert_eq!(w.sample_rate, 16_000);
        assert_eq!(w.samples.len(), 2);
        approx::assert_abs_diff_eq!(w.samples[0], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = WavDecoder
            .decode(Path::new("/definitely/not/here.wav"))
            .unwrap_err();
        assert!(matches!(err, ScoreError::Decode(_)));
    }

    #[test]
    fn garbage_bytes_are_decode_error() {
        let err = WavDecoder.decode_bytes(b"not a riff file").unwrap_err();
        assert!(matches!(err, ScoreError::Decode(_)));
    }

    #[test]
    fn header_only_wav_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, &[]);
        assert!(matches!(
            WavDecoder.decode(&path),
            Err(ScoreError::EmptyInput)
        ));
    }
}
