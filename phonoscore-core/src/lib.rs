//! # phonoscore-core
//!
//! Pronunciation scoring engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! user audio ──► resample/trim ──► MFCC ──┐
//!                                         ├──► DTW ──────────────┐
//! reference audio ─► resample/trim ► MFCC ┘                      │
//!                                                                ├──► DecisionPolicy ──► VerificationResult
//! recognized text ──► dictionary ──► vowel normalizer ──► edit   │
//! target word ─────► dictionary ──► vowel normalizer ──► distance┘
//! ```
//!
//! Speech recognition, reference synthesis and history persistence are
//! traits ([`SpeechRecognizer`], [`ReferenceSynthesizer`], [`AttemptRecorder`]);
//! the engine itself does no I/O.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod alignment;
pub mod audio;
pub mod decision;
pub mod engine;
pub mod error;
pub mod features;
pub mod phonetics;
pub mod recognition;
pub mod record;
pub mod reference;
pub mod result;

// Convenience re-exports for downstream crates
pub use audio::{AudioDecoder, AudioWaveform, WavDecoder};
pub use decision::{DecisionPolicy, Verdict};
pub use engine::{EngineConfig, ScoringEngine, VerificationRequest};
pub use error::{ScoreError, StageError};
pub use features::{FeatureExtractor, FeatureSequence, MfccConfig, MfccExtractor};
pub use phonetics::{Phoneme, PhonemeSequence, PronunciationDictionary};
pub use recognition::{Recognition, RecognitionError, SpeechRecognizer, TranscriptRecognizer};
pub use record::{AttemptRecord, AttemptRecorder, NoopRecorder};
pub use reference::{ReferenceDirectory, ReferenceSynthesizer};
pub use result::{ScoringStage, SkipReason, VerificationResult};
