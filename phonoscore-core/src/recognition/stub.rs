//! `TranscriptRecognizer`, a recognizer that already knows the answer.
//!
//! Used when the transcript comes from somewhere else (a browser speech API,
//! a command-line flag, a test fixture). Ignores the audio.

use tracing::debug;

use super::{RecognitionError, SpeechRecognizer};
use crate::audio::AudioWaveform;

#[derive(Debug, Clone, Default)]
pub struct TranscriptRecognizer {
    transcript: Option<String>,
}

impl TranscriptRecognizer {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
        }
    }

    /// A recognizer that never understands anything.
    pub fn silent() -> Self {
        Self { transcript: None }
    }
}

impl SpeechRecognizer for TranscriptRecognizer {
    fn recognize(&self, audio: &AudioWaveform) -> Result<String, RecognitionError> {
        debug!(samples = audio.samples.len(), "TranscriptRecognizer::recognize");
        match self.transcript.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(RecognitionError::Unrecognized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio() -> AudioWaveform {
        AudioWaveform::new(vec![0.0; 160], 16_000).unwrap()
    }

    #[test]
    fn returns_trimmed_transcript() {
        let r = TranscriptRecognizer::new("  cat ");
        assert_eq!(r.recognize(&audio()).unwrap(), "cat");
    }

    #[test]
    fn blank_or_missing_is_unrecognized() {
        assert!(matches!(
            TranscriptRecognizer::new("").recognize(&audio()),
            Err(RecognitionError::Unrecognized)
        ));
        assert!(matches!(
            TranscriptRecognizer::silent().recognize(&audio()),
            Err(RecognitionError::Unrecognized)
        ));
    }
}
