//! Reference audio: the "how it should sound" side of the acoustic check.
//!
//! In production this is a TTS voice; here it is a trait so the engine does
//! not care. A missing reference is not an error: scoring continues with the
//! phonetic check alone.

use std::path::PathBuf;

use tracing::debug;

use crate::audio::{AudioDecoder, AudioWaveform, WavDecoder};
use crate::error::Result;
use crate::phonetics::normalize_word;

pub trait ReferenceSynthesizer: Send + Sync {
    /// Reference rendition of `word`, or `None` when none can be produced.
    ///
    /// # Errors
    /// Decode or I/O failures of a reference that does exist.
    fn synthesize(&self, word: &str) -> Result<Option<AudioWaveform>>;
}

/// Pre-rendered references stored as `<dir>/<word>.wav`.
#[derive(Debug, Clone)]
pub struct ReferenceDirectory {
    dir: PathBuf,
}

impl ReferenceDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, word: &str) -> PathBuf {
        self.dir.join(format!("{}.wav", normalize_word(word)))
    }
}

impl ReferenceSynthesizer for ReferenceDirectory {
    fn synthesize(&self, word: &str) -> Result<Option<AudioWaveform>> {
        let path = self.path_for(word);
        if !path.is_file() {
            debug!(path = %path.display(), "no reference recording");
            return Ok(None);
        }
        WavDecoder.decode(&path).map(Some)
    }
}
