use thiserror::Error;

use crate::result::ScoringStage;

/// All errors produced by phonoscore-core.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("audio input is empty")]
    EmptyInput,

    #[error("feature sequence is empty; alignment undefined")]
    EmptySequence,

    #[error("feature dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("word not in pronunciation dictionary: {word}")]
    NoReference { word: String },

    #[error("no usable phonemes in recognized speech")]
    NoCandidate,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A scoring run that stopped before reaching a verdict.
///
/// Carries the last stage the engine completed so callers can tell a
/// dictionary miss (stopped at `Idle`) from a decode failure further in.
#[derive(Debug, Error)]
#[error("scoring stopped at {stage:?}: {source}")]
pub struct StageError {
    pub stage: ScoringStage,
    #[source]
    pub source: ScoreError,
}

impl StageError {
    pub fn new(stage: ScoringStage, source: ScoreError) -> Self {
        Self { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, ScoreError>;
