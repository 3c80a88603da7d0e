//! Reduce dictionary pronunciations to their vowel nuclei.
//!
//! Only symbols with a stress digit survive (`K AE1 T` → `AE1`). Consonant
//! realisation is where learner accents differ most, while the vowel skeleton
//! still exposes a wrong syllable count or a swapped vowel. Stress digits are
//! kept on the surviving symbols, so `AE1` and `AE0` compare as different.

use super::{Phoneme, PhonemeSequence};

/// Keep vowel phones, drop consonants.
pub fn normalize(raw: &[Phoneme]) -> PhonemeSequence {
    raw.iter().filter(|p| p.is_vowel()).cloned().collect()
}

/// Normalize every dictionary variant of a word.
pub fn normalize_variants(variants: &[PhonemeSequence]) -> Vec<PhonemeSequence> {
    variants.iter().map(|v| normalize(v)).collect()
}
