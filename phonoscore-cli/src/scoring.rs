//! One scoring attempt from files on disk: resolve every collaborator, then
//! hand the engine a fully resolved request.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use phonoscore_core::{
    AttemptRecord, AttemptRecorder, AudioDecoder, AudioWaveform, Recognition, ReferenceSynthesizer,
    ScoreError, ScoringEngine, SpeechRecognizer, VerificationRequest, VerificationResult,
    WavDecoder,
};
use tracing::{debug, info};

/// A single reference recording used whatever the word.
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    path: PathBuf,
}

impl ReferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReferenceSynthesizer for ReferenceFile {
    fn synthesize(&self, _word: &str) -> phonoscore_core::error::Result<Option<AudioWaveform>> {
        WavDecoder.decode(&self.path).map(Some)
    }
}

pub struct Collaborators<'a> {
    pub decoder: &'a dyn AudioDecoder,
    pub recognizer: &'a dyn SpeechRecognizer,
    pub references: Option<&'a dyn ReferenceSynthesizer>,
    pub recorder: &'a dyn AttemptRecorder,
}

/// Score the recording at `audio_path` against `word`.
///
/// Unknown words are rejected before the recording is read.
pub fn score_attempt(
    engine: &ScoringEngine,
    collaborators: &Collaborators<'_>,
    word: &str,
    audio_path: &Path,
) -> Result<VerificationResult> {
    engine.ensure_known(word)?;

    let user_audio = collaborators
        .decoder
        .decode(audio_path)
        .with_context(|| format!("reading {}", audio_path.display()))?;
    debug!(
        seconds = user_audio.duration_secs(),
        rate = user_audio.sample_rate,
        "user recording decoded"
    );

    let reference_audio = match collaborators.references {
        Some(references) => references
            .synthesize(word)
            .context("loading reference recording")?,
        None => None,
    };
    if reference_audio.is_none() {
        info!(word, "no reference audio; scoring on phonetics only");
    }

    let recognition = Recognition::from_result(collaborators.recognizer.recognize(&user_audio))
        .context("speech recognition")?;

    let result = engine.verify(&VerificationRequest {
        word,
        user_audio: &user_audio,
        reference_audio: reference_audio.as_ref(),
        recognition: &recognition,
    })?;

    collaborators.recorder.record(&AttemptRecord::from_result(
        &result,
        Some(audio_path.display().to_string()),
    ));
    Ok(result)
}

/// `true` when `err` is a dictionary miss rather than a fault.
pub fn is_unknown_word(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ScoreError>(),
            Some(ScoreError::NoReference { .. })
        )
    })
}
