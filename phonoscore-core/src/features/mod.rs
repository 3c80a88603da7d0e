//! Acoustic features.
//!
//! The `FeatureExtractor` trait decouples the engine from any specific
//! frontend. The bundled [`MfccExtractor`] produces one 13-coefficient row per
//! analysis frame; the full per-frame sequence is what reaches alignment.
//! Averaging frames into one vector would reduce DTW to a single-point
//! distance and is deliberately not offered.

pub mod mel;
pub mod mfcc;

pub use mfcc::{MfccConfig, MfccExtractor};

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::audio::AudioWaveform;
use crate::error::{Result, ScoreError};

/// Contract for acoustic frontends.
pub trait FeatureExtractor: Send + Sync {
    /// Convert a waveform into one feature row per frame.
    ///
    /// # Errors
    /// `ScoreError::EmptyInput` for a waveform without samples.
    fn extract(&self, waveform: &AudioWaveform) -> Result<FeatureSequence>;

    /// Number of coefficients per frame.
    fn dimension(&self) -> usize;
}

/// Frames × coefficients. Never empty; every row has the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    frames: Array2<f32>,
}

impl FeatureSequence {
    /// Wrap a frames × coefficients matrix.
    ///
    /// # Errors
    /// `ScoreError::EmptySequence` when there are no frames or no coefficients.
    pub fn new(frames: Array2<f32>) -> Result<Self> {
        if frames.nrows() == 0 || frames.ncols() == 0 {
            return Err(ScoreError::EmptySequence);
        }
        Ok(Self { frames })
    }

    /// Build from row vectors, checking that every row has the same width.
    pub fn from_frames(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map(Vec::len).ok_or(ScoreError::EmptySequence)?;
        let n = rows.len();
        let mut flat = Vec::with_capacity(n * dim);
        for row in rows {
            if row.len() != dim {
                return Err(ScoreError::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            flat.extend(row);
        }
        let frames = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| ScoreError::Other(anyhow::anyhow!("feature matrix shape: {e}")))?;
        Self::new(frames)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.nrows()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.nrows() == 0
    }

    /// Coefficients per frame.
    pub fn dim(&self) -> usize {
        self.frames.ncols()
    }

    pub fn frame(&self, index: usize) -> ArrayView1<'_, f32> {
        self.frames.row(index)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.frames.view()
    }
}
