//! Speech-to-text seam.
//!
//! The engine never calls a recognizer. Callers resolve the transcript first
//! and pass the outcome in, which keeps scoring pure and lets a flaky remote
//! service fail without touching engine state.

pub mod stub;

pub use stub::TranscriptRecognizer;

use thiserror::Error;

use crate::audio::AudioWaveform;

/// Failures a recognizer can report. The two are handled differently:
/// `Unrecognized` degrades scoring to a partial result, `ServiceUnavailable`
/// aborts the request and is the caller's to retry.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("could not understand the audio")]
    Unrecognized,

    #[error("speech recognition service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Contract for speech recognition backends.
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe a whole utterance.
    ///
    /// # Errors
    /// `RecognitionError::Unrecognized` when the audio contains no intelligible
    /// speech, `RecognitionError::ServiceUnavailable` on transport failures.
    fn recognize(&self, audio: &AudioWaveform) -> Result<String, RecognitionError>;
}

/// What the caller learned from its recognizer, in the form the engine takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Text(String),
    Unrecognized,
}

impl Recognition {
    /// Fold a recognizer result into a `Recognition`, passing service outages
    /// through as errors.
    pub fn from_result(result: Result<String, RecognitionError>) -> Result<Self, RecognitionError> {
        match result {
            Ok(text) if text.trim().is_empty() => Ok(Recognition::Unrecognized),
            Ok(text) => Ok(Recognition::Text(text)),
            Err(RecognitionError::Unrecognized) => Ok(Recognition::Unrecognized),
            Err(e) => Err(e),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Recognition::Text(t) => Some(t.as_str()),
            Recognition::Unrecognized => None,
        }
    }
}
