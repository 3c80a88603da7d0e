//! Nearest dictionary variant by Levenshtein distance.

use serde::Serialize;

use super::PhonemeSequence;
use crate::error::{Result, ScoreError};

/// The closest variant and how far the candidate is from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatch {
    pub distance: usize,
    /// Index into the variant list handed to [`best_variant`].
    pub variant_index: usize,
    pub variant: PhonemeSequence,
}

/// Unit-cost insert/delete/substitute distance between two symbol sequences.
///
/// Two rolling rows, O(|a|·|b|) time and O(|b|) space.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let cost = usize::from(x != y);
            curr[j + 1] = (prev[j + 1] + 1) // deletion
                .min(curr[j] + 1) // insertion
                .min(prev[j] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Smallest distance from `candidate` to any of `variants`.
///
/// Ties go to the earliest variant in dictionary order.
///
/// # Errors
/// - `ScoreError::NoReference` when `variants` is empty (word unknown).
/// - `ScoreError::NoCandidate` when `candidate` is empty; the caller should
///   skip the phonetic check rather than score a maximal distance.
pub fn best_variant(candidate: &PhonemeSequence, variants: &[PhonemeSequence]) -> Result<BestMatch> {
    if variants.is_empty() {
        return Err(ScoreError::NoReference {
            word: String::new(),
        });
    }
    if candidate.is_empty() {
        return Err(ScoreError::NoCandidate);
    }

    let mut best: Option<BestMatch> = None;
    for (index, variant) in variants.iter().enumerate() {
        let distance = edit_distance(candidate, variant);
        if best.as_ref().map_or(true, |b| distance < b.distance) {
            best = Some(BestMatch {
                distance,
                variant_index: index,
                variant: variant.clone(),
            });
            if distance == 0 {
                break;
            }
        }
    }
    best.ok_or(ScoreError::NoCandidate)
}

/// `1 - lev(a, b) / max(len)` over lowercased characters, in [0, 1].
///
/// An advisory orthographic score: it compares spellings, not sounds.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.trim().to_lowercase().chars().collect();
    let b: Vec<char> = b.trim().to_lowercase().chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    1.0 - edit_distance(&a, &b) as f32 / longest as f32
}
