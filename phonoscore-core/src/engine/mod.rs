//! `ScoringEngine`: one verification request, end to end.
//!
//! ## Stages
//!
//! ```text
//! Idle ──► FeatureExtracted ──► Aligned ──► PhoneticallyCompared ──► Decided
//!  │              │                 │
//!  └─ unknown     └─ decode/empty   └─ nothing recognized:
//!     word           audio             partial result (alignment only)
//! ```
//!
//! A dictionary miss is detected before any audio work. Errors carry the
//! last completed stage ([`StageError`]). Nothing is retried.
//!
//! ## Threading
//!
//! The engine holds no mutable state. It is `Send + Sync`; share one behind
//! an `Arc` and call [`ScoringEngine::verify`] from as many threads as needed.
//! The dictionary is likewise shared read-only.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    alignment,
    audio::{resample, trim::SilenceTrimmer, AudioWaveform},
    decision::DecisionPolicy,
    error::{Result, ScoreError, StageError},
    features::{FeatureExtractor, FeatureSequence, MfccConfig, MfccExtractor},
    phonetics::{
        normalize, normalize_word, normalizer::normalize_variants, scorer, PhonemeSequence,
        PronunciationDictionary,
    },
    recognition::Recognition,
    result::{ScoringStage, SkipReason, VerificationResult},
};

/// Configuration for `ScoringEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Rate every waveform is converted to before feature extraction (Hz).
    /// Default: 16000.
    pub target_sample_rate: u32,
    /// RMS level below which leading/trailing frames are trimmed.
    /// `None` disables trimming. Default: `Some(0.01)`.
    pub silence_threshold: Option<f32>,
    /// MFCC frontend parameters.
    pub mfcc: MfccConfig,
    /// Verdict thresholds. `decision.alignment_ceiling` is calibrated for
    /// `mfcc`; change them together.
    pub decision: DecisionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
            silence_threshold: Some(0.01),
            mfcc: MfccConfig::default(),
            decision: DecisionPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_sample_rate == 0 {
            return Err(ScoreError::InvalidConfig(
                "target sample rate must be positive".into(),
            ));
        }
        if let Some(t) = self.silence_threshold {
            if !(0.0..1.0).contains(&t) {
                return Err(ScoreError::InvalidConfig(format!(
                    "silence threshold must be in [0, 1) (got {t})"
                )));
            }
        }
        self.mfcc.validate()?;
        self.decision.validate()
    }
}

/// Inputs for one scoring call. Everything external is already resolved.
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub word: &'a str,
    pub user_audio: &'a AudioWaveform,
    /// Reference rendition; `None` limits scoring to the phonetic check.
    pub reference_audio: Option<&'a AudioWaveform>,
    pub recognition: &'a Recognition,
}

pub struct ScoringEngine {
    config: EngineConfig,
    dictionary: Arc<PronunciationDictionary>,
    extractor: Box<dyn FeatureExtractor>,
    trimmer: Option<SilenceTrimmer>,
}

impl ScoringEngine {
    /// Engine with the bundled MFCC frontend.
    pub fn new(config: EngineConfig, dictionary: Arc<PronunciationDictionary>) -> Result<Self> {
        let extractor = MfccExtractor::new(config.mfcc.clone(), config.target_sample_rate)?;
        Self::with_extractor(config, dictionary, Box::new(extractor))
    }

    /// Engine with a caller-supplied frontend. `config.mfcc` is ignored, but
    /// `config.decision.alignment_ceiling` must suit the new features.
    pub fn with_extractor(
        config: EngineConfig,
        dictionary: Arc<PronunciationDictionary>,
        extractor: Box<dyn FeatureExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        let trimmer = config
            .silence_threshold
            .map(|t| SilenceTrimmer::new(t, 20, 2));
        info!(
            words = dictionary.len(),
            dim = extractor.dimension(),
            ceiling = config.decision.alignment_ceiling,
            tolerance = config.decision.tolerance_factor,
            "scoring engine ready"
        );
        Ok(Self {
            config,
            dictionary,
            extractor,
            trimmer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &PronunciationDictionary {
        &self.dictionary
    }

    /// Fail fast on words the dictionary cannot ground.
    ///
    /// # Errors
    /// `ScoreError::NoReference` when `word` has no dictionary entry.
    pub fn ensure_known(&self, word: &str) -> Result<()> {
        if self.dictionary.contains(word) {
            Ok(())
        } else {
            Err(ScoreError::NoReference {
                word: normalize_word(word),
            })
        }
    }

    /// Normalized vowel sequences for every variant of `word`.
    pub fn reference_variants(&self, word: &str) -> Result<Vec<PhonemeSequence>> {
        self.ensure_known(word)?;
        Ok(normalize_variants(self.dictionary.lookup(word)))
    }

    /// Candidate phonemes for recognized text: the first variant of each
    /// known word, normalized and concatenated. Unknown words contribute
    /// nothing.
    pub fn candidate_phonemes(&self, text: &str) -> PhonemeSequence {
        text.split_whitespace()
            .filter_map(|token| {
                let variants = self.dictionary.lookup(token);
                if variants.is_empty() {
                    debug!(token, "recognized word not in dictionary");
                }
                variants.first()
            })
            .flat_map(|variant| normalize(variant))
            .collect()
    }

    /// Resample, trim and extract features for one waveform.
    pub fn features(&self, waveform: &AudioWaveform) -> Result<FeatureSequence> {
        if waveform.is_empty() {
            return Err(ScoreError::EmptyInput);
        }
        let mut audio = resample::to_rate(waveform, self.config.target_sample_rate)?;
        if let Some(trimmer) = &self.trimmer {
            audio = trimmer.trim(&audio);
        }
        self.extractor.extract(&audio)
    }

    /// Score one attempt.
    ///
    /// Returns a full result, a partial result (`edit_distance == None`,
    /// verdict `Incorrect`) when no usable phonemes were recognized, or a
    /// [`StageError`] naming where the run stopped.
    pub fn verify(
        &self,
        request: &VerificationRequest<'_>,
    ) -> std::result::Result<VerificationResult, StageError> {
        let mut stage = ScoringStage::Idle;
        let word = request.word.trim();

        let variants = self
            .reference_variants(word)
            .map_err(|e| StageError::new(stage, e))?;
        let reference_phonemes = variants.first().cloned().unwrap_or_default();

        let user_features = self
            .features(request.user_audio)
            .map_err(|e| StageError::new(stage, e))?;
        let reference_features = request
            .reference_audio
            .map(|audio| self.features(audio))
            .transpose()
            .map_err(|e| StageError::new(stage, e))?;
        stage = ScoringStage::FeatureExtracted;
        debug!(
            ?stage,
            user_frames = user_features.len(),
            reference_frames = reference_features.as_ref().map(FeatureSequence::len),
            "features extracted"
        );

        let alignment_score = reference_features
            .as_ref()
            .map(|reference| alignment::align(&user_features, reference))
            .transpose()
            .map_err(|e| StageError::new(stage, e))?;
        stage = ScoringStage::Aligned;
        debug!(?stage, alignment_score, "aligned");

        let recognized_text = request.recognition.text().map(str::to_string);
        let text_similarity = recognized_text
            .as_deref()
            .map(|text| scorer::text_similarity(word, text));

        let (candidate_phonemes, skip_reason) = match request.recognition {
            Recognition::Unrecognized => (Vec::new(), Some(SkipReason::NoSpeechRecognized)),
            Recognition::Text(text) => {
                let candidate = self.candidate_phonemes(text);
                let skip = candidate.is_empty().then_some(SkipReason::NoVowelPhonemes);
                (candidate, skip)
            }
        };

        let best = if skip_reason.is_none() {
            match scorer::best_variant(&candidate_phonemes, &variants) {
                Ok(best) => Some(best),
                Err(ScoreError::NoReference { .. }) => {
                    return Err(StageError::new(
                        stage,
                        ScoreError::NoReference {
                            word: normalize_word(word),
                        },
                    ))
                }
                Err(e) => return Err(StageError::new(stage, e)),
            }
        } else {
            None
        };
        if best.is_some() {
            stage = ScoringStage::PhoneticallyCompared;
        }
        debug!(
            ?stage,
            ?skip_reason,
            distance = best.as_ref().map(|b| b.distance),
            "phonetic comparison"
        );

        let reference_len = best
            .as_ref()
            .map_or(reference_phonemes.len(), |b| b.variant.len());
        let policy = &self.config.decision;
        let edit_distance = best.as_ref().map(|b| b.distance);
        let verdict = policy.decide(alignment_score, edit_distance, reference_len);
        if best.is_some() {
            stage = ScoringStage::Decided;
        }

        info!(
            word,
            ?verdict,
            alignment_score,
            edit_distance,
            partial = best.is_none(),
            "attempt scored"
        );

        Ok(VerificationResult {
            word: word.to_string(),
            alignment_score,
            edit_distance,
            matched_variant: best.map(|b| b.variant),
            verdict,
            reference_phonemes,
            candidate_phonemes,
            max_allowed_distance: policy.max_allowed_distance(reference_len),
            recognized_text,
            text_similarity,
            skip_reason,
            stage,
        })
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("config", &self.config)
            .field("words", &self.dictionary.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonetics::phonemes;

    fn engine() -> ScoringEngine {
        let dict = PronunciationDictionary::from_entries([
            ("cat", vec![phonemes("K AE1 T")]),
            ("cut", vec![phonemes("K AH1 T")]),
            ("banana", vec![phonemes("B AH0 N AE1 N AH0")]),
            ("hmm", vec![phonemes("HH M")]),
        ]);
        ScoringEngine::new(EngineConfig::default(), Arc::new(dict)).unwrap()
    }

    #[test]
    fn candidate_phonemes_concatenate_known_words() {
        let e = engine();
        assert_eq!(e.candidate_phonemes("cat banana"), phonemes("AE1 AH0 AE1 AH0"));
        assert_eq!(e.candidate_phonemes("cat zzyzx"), phonemes("AE1"));
        assert!(e.candidate_phonemes("hmm").is_empty());
        assert!(e.candidate_phonemes("").is_empty());
    }

    #[test]
    fn ensure_known_rejects_unknown_words() {
        let err = engine().ensure_known(" Zzyzx ").unwrap_err();
        assert!(matches!(err, ScoreError::NoReference { ref word } if word == "zzyzx"));
    }

    #[test]
    fn features_reject_empty_audio() {
        let empty = AudioWaveform {
            samples: vec![],
            sample_rate: 16_000,
        };
        assert!(matches!(engine().features(&empty), Err(ScoreError::EmptyInput)));
    }

    #[test]
    fn config_validation() {
        let bad = EngineConfig {
            silence_threshold: Some(2.0),
            ..EngineConfig::default()
        };
        assert!(bad.validate().is_err());
        let zero_rate = EngineConfig {
            target_sample_rate: 0,
            ..EngineConfig::default()
        };
        assert!(zero_rate.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScoringEngine>();
    }
}
