//! Fuse the acoustic and phonetic scores into a verdict.
//!
//! ```text
//! max_allowed = max(min_allowed_distance, floor(reference_len * tolerance))
//! correct     = alignment < alignment_ceiling  &&  distance <= max_allowed
//! ```
//!
//! `alignment_ceiling` is only meaningful for one feature frontend: raw DTW
//! totals grow with frame count and with the scale of the coefficients. Any
//! change to `MfccConfig` (or a different `FeatureExtractor`) needs a new
//! ceiling measured on known-good and known-bad attempts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};

/// Binary outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }
}

/// Thresholds for [`DecisionPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    /// Fraction of the reference length allowed as edit distance. Default 0.5,
    /// intentionally loose so accented vowels are not punished too hard.
    pub tolerance_factor: f64,
    /// Floor for the allowed distance regardless of word length. Default 2.
    pub min_allowed_distance: usize,
    /// DTW totals at or above this are rejected. Default 400.0.
    ///
    /// The total is an unnormalized sum over the warping path, so it grows
    /// with clip length. The default assumes the bundled frontend (c0
    /// dropped, so level differences cost nothing) and single-word clips of
    /// up to about a second and a half; longer material needs a higher value.
    pub alignment_ceiling: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            tolerance_factor: 0.5,
            min_allowed_distance: 2,
            alignment_ceiling: 400.0,
        }
    }
}

impl DecisionPolicy {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_factor.is_finite() || self.tolerance_factor < 0.0 {
            return Err(ScoreError::InvalidConfig(format!(
                "tolerance factor must be a non-negative number (got {})",
                self.tolerance_factor
            )));
        }
        if self.alignment_ceiling.is_nan() || self.alignment_ceiling <= 0.0 {
            return Err(ScoreError::InvalidConfig(format!(
                "alignment ceiling must be positive (got {})",
                self.alignment_ceiling
            )));
        }
        Ok(())
    }

    /// Largest edit distance still accepted for a reference of this length.
    pub fn max_allowed_distance(&self, reference_len: usize) -> usize {
        let scaled = (reference_len as f64 * self.tolerance_factor).floor() as usize;
        scaled.max(self.min_allowed_distance)
    }

    /// `alignment == None` means no reference audio was available and the
    /// acoustic check is not applied. `distance == None` means no phonetic
    /// comparison took place, which is always `Incorrect`.
    pub fn decide(
        &self,
        alignment: Option<f64>,
        distance: Option<usize>,
        reference_len: usize,
    ) -> Verdict {
        let Some(distance) = distance else {
            return Verdict::Incorrect;
        };
        let acoustic_ok = alignment.map_or(true, |score| score < self.alignment_ceiling);
        let phonetic_ok = distance <= self.max_allowed_distance(reference_len);
        if acoustic_ok && phonetic_ok {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }
}
