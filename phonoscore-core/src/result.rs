//! Payloads handed back to callers.
//!
//! Serialized with camelCase keys; `Option` fields serialize as `null` so a
//! client can tell "never compared" (`editDistance: null`) from "compared and
//! far off" (`editDistance: 4`).

use serde::{Deserialize, Serialize};

use crate::decision::Verdict;
use crate::phonetics::PhonemeSequence;

/// Progress of one scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringStage {
    /// Request accepted, nothing computed yet.
    Idle,
    /// MFCC sequences built for the user (and reference) audio.
    FeatureExtracted,
    /// DTW score computed, or skipped for lack of reference audio.
    Aligned,
    /// Candidate phonemes compared against the dictionary variants.
    PhoneticallyCompared,
    /// Verdict reached.
    Decided,
}

/// Why the phonetic comparison did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The recognizer returned nothing.
    NoSpeechRecognized,
    /// Text was recognized but none of it maps to vowel phonemes.
    NoVowelPhonemes,
}

/// Outcome of one verification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Target word as requested.
    pub word: String,
    /// DTW score; `None` when no reference audio was supplied.
    pub alignment_score: Option<f64>,
    /// Best edit distance; `None` when the phonetic check was skipped.
    pub edit_distance: Option<usize>,
    /// Normalized variant the candidate matched best.
    pub matched_variant: Option<PhonemeSequence>,
    pub verdict: Verdict,
    /// Normalized vowel sequence of the first dictionary variant.
    pub reference_phonemes: PhonemeSequence,
    /// Normalized candidate phonemes derived from the recognized text.
    pub candidate_phonemes: PhonemeSequence,
    /// Threshold the edit distance was held against.
    pub max_allowed_distance: usize,
    /// Transcript the candidate phonemes came from, if any.
    pub recognized_text: Option<String>,
    /// Orthographic similarity of target and transcript, advisory only.
    pub text_similarity: Option<f32>,
    pub skip_reason: Option<SkipReason>,
    pub stage: ScoringStage,
}

impl VerificationResult {
    /// `true` when only the acoustic half could be computed.
    pub fn is_partial(&self) -> bool {
        self.edit_distance.is_none()
    }

    /// Short learner-facing message.
    pub fn feedback(&self) -> &'static str {
        match (self.verdict, self.skip_reason) {
            (Verdict::Correct, _) => "Correct pronunciation",
            (Verdict::Incorrect, Some(SkipReason::NoSpeechRecognized)) => {
                "Could not understand the audio"
            }
            (Verdict::Incorrect, _) => "Try again",
        }
    }
}
