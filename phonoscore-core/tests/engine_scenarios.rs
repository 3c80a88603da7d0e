use std::f32::consts::PI;
use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use ndarray::array;
use phonoscore_core::alignment::{align, align_frames, cost_matrix};
use phonoscore_core::phonetics::{edit_distance, phonemes};
use phonoscore_core::{
    AudioWaveform, DecisionPolicy, EngineConfig, FeatureSequence, PronunciationDictionary,
    Recognition, ScoreError, ScoringEngine, ScoringStage, SkipReason, VerificationRequest,
    Verdict,
};

fn dictionary() -> Arc<PronunciationDictionary> {
    Arc::new(PronunciationDictionary::from_entries([
        ("cat", vec![phonemes("K AE1 T")]),
        ("cut", vec![phonemes("K AH1 T")]),
        ("banana", vec![phonemes("B AH0 N AE1 N AH0")]),
        (
            "either",
            vec![phonemes("IY1 DH ER0"), phonemes("AY1 DH ER0")],
        ),
        ("ayther", vec![phonemes("AY1 DH ER0")]),
        ("hmm", vec![phonemes("HH M")]),
    ]))
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(EngineConfig::default(), dictionary()).unwrap()
}

fn tone(freq: f32, secs: f32, sample_rate: u32) -> AudioWaveform {
    let n = (secs * sample_rate as f32) as usize;
    let samples = (0..n)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect();
    AudioWaveform::new(samples, sample_rate).unwrap()
}

fn text(t: &str) -> Recognition {
    Recognition::Text(t.into())
}

// ── End-to-end scenarios ──────────────────────────────────────────────────

#[test]
fn matching_word_and_identical_audio_is_correct() {
    let engine = engine();
    let audio = tone(220.0, 0.5, 16_000);
    let recognition = text("cat");

    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &audio,
            reference_audio: Some(&audio),
            recognition: &recognition,
        })
        .unwrap();

    assert_eq!(result.reference_phonemes, phonemes("AE1"));
    assert_eq!(result.candidate_phonemes, phonemes("AE1"));
    assert_eq!(result.edit_distance, Some(0));
    assert_eq!(result.alignment_score, Some(0.0));
    assert_eq!(result.verdict, Verdict::Correct);
    assert_eq!(result.stage, ScoringStage::Decided);
    assert_eq!(result.feedback(), "Correct pronunciation");
    assert!(!result.is_partial());
}

#[test]
fn nothing_recognized_gives_partial_result_with_alignment() {
    let engine = engine();
    let user = tone(220.0, 0.5, 16_000);
    let reference = tone(330.0, 0.5, 16_000);

    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: Some(&reference),
            recognition: &Recognition::Unrecognized,
        })
        .unwrap();

    assert!(result.is_partial());
    assert_eq!(result.edit_distance, None);
    assert_eq!(result.verdict, Verdict::Incorrect);
    assert_eq!(result.skip_reason, Some(SkipReason::NoSpeechRecognized));
    assert_eq!(result.stage, ScoringStage::Aligned);
    assert_eq!(result.feedback(), "Could not understand the audio");
    let score = result.alignment_score.expect("both waveforms present");
    assert!(score.is_finite() && score > 0.0);
}

#[test]
fn unknown_word_fails_before_any_audio_work() {
    let engine = engine();
    // Would fail decoding if the engine touched it.
    let empty = AudioWaveform {
        samples: vec![],
        sample_rate: 0,
    };

    let err = engine
        .verify(&VerificationRequest {
            word: "zzyzx",
            user_audio: &empty,
            reference_audio: Some(&empty),
            recognition: &text("zzyzx"),
        })
        .unwrap_err();

    assert_eq!(err.stage, ScoringStage::Idle);
    assert!(matches!(err.source, ScoreError::NoReference { ref word } if word == "zzyzx"));
}

#[test]
fn identical_waveforms_align_to_exactly_zero() {
    let engine = engine();
    let audio = tone(440.0, 0.75, 22_050);
    let a = engine.features(&audio).unwrap();
    let b = engine.features(&audio.clone()).unwrap();
    assert_eq!(align(&a, &b).unwrap(), 0.0);
}

#[test]
fn cost_matrix_shape_border_and_manual_path() {
    let a = array![[0.0f32, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
    let b = array![[0.0f32, 0.0], [2.0, 0.0], [4.0, 0.0]];

    let d = cost_matrix(a.view(), b.view()).unwrap();
    assert_eq!(d.dim(), (6, 4));
    assert_eq!(d[[0, 0]], 0.0);
    for i in 1..6 {
        assert!(d[[i, 0]].is_infinite());
    }
    for j in 1..4 {
        assert!(d[[0, j]].is_infinite());
    }

    // a0-b0, a1-b1, a2-b1, a3-b2, a4-b2: 0 + 1 + 0 + 1 + 0
    assert_abs_diff_eq!(d[[5, 3]], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(align_frames(a.view(), b.view()).unwrap(), 2.0, epsilon = 1e-12);
}

// ── Decision paths ────────────────────────────────────────────────────────

#[test]
fn no_reference_audio_decides_on_phonetics_alone() {
    let engine = engine();
    let user = tone(220.0, 0.5, 16_000);
    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: None,
            recognition: &text("cut"),
        })
        .unwrap();

    assert_eq!(result.alignment_score, None);
    assert_eq!(result.edit_distance, Some(1));
    assert_eq!(result.max_allowed_distance, 2);
    assert_eq!(result.verdict, Verdict::Correct);
}

#[test]
fn distant_transcript_is_incorrect() {
    let engine = engine();
    let user = tone(220.0, 0.5, 16_000);
    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: Some(&user),
            recognition: &text("banana banana"),
        })
        .unwrap();

    assert_eq!(result.edit_distance, Some(5));
    assert_eq!(result.verdict, Verdict::Incorrect);
    assert_eq!(result.feedback(), "Try again");
}

#[test]
fn alignment_above_ceiling_rejects_a_perfect_transcript() {
    let config = EngineConfig {
        decision: DecisionPolicy {
            alignment_ceiling: 1e-6,
            ..DecisionPolicy::default()
        },
        ..EngineConfig::default()
    };
    let engine = ScoringEngine::new(config, dictionary()).unwrap();
    let user = tone(220.0, 0.5, 16_000);
    let reference = tone(880.0, 0.5, 16_000);

    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: Some(&reference),
            recognition: &text("cat"),
        })
        .unwrap();

    assert_eq!(result.edit_distance, Some(0));
    assert_eq!(result.verdict, Verdict::Incorrect);
}

#[test]
fn best_of_several_variants_is_chosen() {
    let engine = engine();
    let user = tone(220.0, 0.5, 16_000);
    let result = engine
        .verify(&VerificationRequest {
            word: "either",
            user_audio: &user,
            reference_audio: None,
            recognition: &text("ayther"),
        })
        .unwrap();

    assert_eq!(result.edit_distance, Some(0));
    assert_eq!(result.matched_variant, Some(phonemes("AY1 ER0")));
    // Reference phonemes are always the primary variant.
    assert_eq!(result.reference_phonemes, phonemes("IY1 ER0"));
}

#[test]
fn transcript_without_vowels_skips_phonetic_check() {
    let engine = engine();
    let user = tone(220.0, 0.5, 16_000);
    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: None,
            recognition: &text("hmm"),
        })
        .unwrap();

    assert!(result.is_partial());
    assert_eq!(result.skip_reason, Some(SkipReason::NoVowelPhonemes));
    assert_eq!(result.recognized_text.as_deref(), Some("hmm"));
    assert_eq!(result.verdict, Verdict::Incorrect);
}

#[test]
fn mixed_sample_rates_are_aligned_after_resampling() {
    let engine = engine();
    let user = tone(300.0, 0.5, 44_100);
    let reference = tone(300.0, 0.5, 16_000);
    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: Some(&reference),
            recognition: &text("cat"),
        })
        .unwrap();
    assert!(result.alignment_score.is_some_and(f64::is_finite));
}

#[test]
fn a_single_high_rate_sample_still_yields_a_frame() {
    let engine = engine();
    let blip = AudioWaveform::new(vec![0.3], 48_000).unwrap();
    let seq = engine.features(&blip).unwrap();
    assert_eq!(seq.len(), 1);
    assert_eq!(seq.dim(), 13);
}

// ── Default alignment ceiling ─────────────────────────────────────────────

fn scaled(audio: &AudioWaveform, gain: f32) -> AudioWaveform {
    AudioWaveform::new(audio.samples.iter().map(|s| s * gain).collect(), audio.sample_rate)
        .unwrap()
}

/// Deterministic broadband noise (xorshift32).
fn noise(secs: f32, sample_rate: u32) -> AudioWaveform {
    let mut state = 0x9e37_79b9u32;
    let n = (secs * sample_rate as f32) as usize;
    let samples = (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            0.3 * (state as f32 / u32::MAX as f32 * 2.0 - 1.0)
        })
        .collect();
    AudioWaveform::new(samples, sample_rate).unwrap()
}

#[test]
fn quieter_take_of_the_same_sound_is_accepted_by_default() {
    let engine = engine();
    let reference = tone(220.0, 0.6, 16_000);
    for gain in [1.2, 0.8, 0.6] {
        let user = scaled(&reference, gain);
        let result = engine
            .verify(&VerificationRequest {
                word: "cat",
                user_audio: &user,
                reference_audio: Some(&reference),
                recognition: &text("cat"),
            })
            .unwrap();
        let score = result.alignment_score.unwrap();
        assert!(score < 1.0, "gain {gain}: score {score}");
        assert_eq!(result.verdict, Verdict::Correct, "gain {gain}");
    }
}

#[test]
fn unrelated_sound_is_rejected_by_the_default_ceiling() {
    let engine = engine();
    let reference = tone(220.0, 0.6, 16_000);
    let user = noise(0.6, 16_000);
    let result = engine
        .verify(&VerificationRequest {
            word: "cat",
            user_audio: &user,
            reference_audio: Some(&reference),
            recognition: &text("cat"),
        })
        .unwrap();
    let score = result.alignment_score.unwrap();
    assert!(
        score >= DecisionPolicy::default().alignment_ceiling,
        "score {score}"
    );
    assert_eq!(result.edit_distance, Some(0));
    assert_eq!(result.verdict, Verdict::Incorrect);
}

#[test]
fn raising_tolerance_never_flips_correct_to_incorrect() {
    let user = tone(220.0, 0.5, 16_000);
    let transcripts = ["cat", "cut", "banana", "banana banana", "cat cat cat"];
    let mut previous: Option<Vec<Verdict>> = None;

    for k in [0.0, 0.25, 0.5, 1.0, 2.0, 4.0] {
        let config = EngineConfig {
            decision: DecisionPolicy {
                tolerance_factor: k,
                ..DecisionPolicy::default()
            },
            ..EngineConfig::default()
        };
        let engine = ScoringEngine::new(config, dictionary()).unwrap();
        let verdicts: Vec<Verdict> = transcripts
            .iter()
            .map(|t| {
                engine
                    .verify(&VerificationRequest {
                        word: "banana",
                        user_audio: &user,
                        reference_audio: None,
                        recognition: &text(t),
                    })
                    .unwrap()
                    .verdict
            })
            .collect();
        if let Some(prev) = &previous {
            for (before, after) in prev.iter().zip(&verdicts) {
                assert!(!(before.is_correct() && !after.is_correct()));
            }
        }
        previous = Some(verdicts);
    }
}

// ── Metric properties ─────────────────────────────────────────────────────

#[test]
fn dtw_is_symmetric_and_non_negative() {
    let engine = engine();
    let a = engine.features(&tone(200.0, 0.4, 16_000)).unwrap();
    let b = engine.features(&tone(500.0, 0.6, 16_000)).unwrap();
    let ab = align(&a, &b).unwrap();
    let ba = align(&b, &a).unwrap();
    assert!(ab > 0.0);
    assert_abs_diff_eq!(ab, ba, epsilon = 1e-9);
}

#[test]
fn dtw_prefers_the_closer_sequence() {
    let base = FeatureSequence::from_frames(vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]])
        .unwrap();
    let near = FeatureSequence::from_frames(vec![vec![0.1, 0.0], vec![1.1, 1.0], vec![2.1, 2.0]])
        .unwrap();
    let far = FeatureSequence::from_frames(vec![vec![3.0, 0.0], vec![4.0, 1.0], vec![5.0, 2.0]])
        .unwrap();
    assert!(align(&base, &near).unwrap() < align(&base, &far).unwrap());
}

#[test]
fn appended_frames_never_beat_the_best_sub_alignment() {
    let a = array![[0.0f32, 1.0], [2.0, 0.5], [1.0, 1.0], [3.0, 2.0]];
    let b = array![[0.5f32, 1.0], [2.0, 1.0], [2.5, 2.0]];
    let d = cost_matrix(a.view(), b.view()).unwrap();
    let best_prefix = (1..=a.nrows())
        .map(|i| d[[i, b.nrows()]])
        .fold(f64::INFINITY, f64::min);

    for extra in [[3.0f32, 2.0], [0.0, 0.0], [10.0, -4.0]] {
        let mut longer = b.clone();
        longer.push_row(ndarray::ArrayView1::from(&extra)).unwrap();
        let score = align_frames(a.view(), longer.view()).unwrap();
        assert!(score >= best_prefix);
    }
}

#[test]
fn edit_distance_is_a_metric() {
    let words = [
        phonemes(""),
        phonemes("AE1"),
        phonemes("AH0 AE1 AH0"),
        phonemes("IY1 ER0"),
        phonemes("AY1 ER0"),
    ];
    for a in &words {
        assert_eq!(edit_distance(a, a), 0);
        for b in &words {
            assert_eq!(edit_distance(a, b), edit_distance(b, a));
            for c in &words {
                assert!(edit_distance(a, c) <= edit_distance(a, b) + edit_distance(b, c));
            }
        }
    }
    assert_eq!(edit_distance(&words[0], &words[2]), 3);
}

// ── Concurrency ───────────────────────────────────────────────────────────

#[test]
fn concurrent_requests_match_serial_results() {
    let engine = Arc::new(engine());
    let user = tone(220.0, 0.5, 16_000);
    let reference = tone(250.0, 0.5, 16_000);
    let transcripts = ["cat", "cut", "banana", "hmm"];

    let serial: Vec<_> = transcripts
        .iter()
        .map(|t| {
            engine
                .verify(&VerificationRequest {
                    word: "cat",
                    user_audio: &user,
                    reference_audio: Some(&reference),
                    recognition: &text(t),
                })
                .unwrap()
        })
        .collect();

    let parallel: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = transcripts
            .iter()
            .map(|t| {
                let engine = Arc::clone(&engine);
                let (user, reference) = (&user, &reference);
                s.spawn(move || {
                    engine
                        .verify(&VerificationRequest {
                            word: "cat",
                            user_audio: user,
                            reference_audio: Some(reference),
                            recognition: &text(t),
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(serial, parallel);
}
