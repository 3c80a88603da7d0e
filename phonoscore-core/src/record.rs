//! Attempt history seam.
//!
//! Recording is fire-and-forget from the scoring side: a failed write is
//! logged by the recorder and never changes the verdict the learner sees.

use std::time::SystemTime;

use crate::decision::Verdict;
use crate::result::VerificationResult;

/// One row of attempt history.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub word: String,
    pub timestamp: SystemTime,
    /// Where the learner's recording was stored, if anywhere.
    pub audio_path: Option<String>,
    pub recognized_text: Option<String>,
    pub alignment_score: Option<f64>,
    pub edit_distance: Option<usize>,
    pub verdict: Verdict,
}

impl AttemptRecord {
    pub fn from_result(result: &VerificationResult, audio_path: Option<String>) -> Self {
        Self {
            word: result.word.clone(),
            timestamp: SystemTime::now(),
            audio_path,
            recognized_text: result.recognized_text.clone(),
            alignment_score: result.alignment_score,
            edit_distance: result.edit_distance,
            verdict: result.verdict,
        }
    }
}

pub trait AttemptRecorder: Send + Sync {
    /// Persist `attempt`. Implementations log their own failures.
    fn record(&self, attempt: &AttemptRecord);
}

/// Discards everything; for callers that opted out of history.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl AttemptRecorder for NoopRecorder {
    fn record(&self, _attempt: &AttemptRecord) {}
}
