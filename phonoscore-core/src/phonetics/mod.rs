//! Phoneme symbols and the symbolic half of scoring.
//!
//! ```text
//! recognized text ─┐
//!                  ├─ PronunciationDictionary::lookup ─► normalize ─► PhoneticScorer
//! target word ─────┘
//! ```

pub mod dictionary;
pub mod normalizer;
pub mod scorer;

pub use dictionary::PronunciationDictionary;
pub use normalizer::normalize;
pub use scorer::{edit_distance, BestMatch};

use std::fmt;

use serde::{Deserialize, Serialize};

/// One ARPABET symbol, e.g. `K` or `AE1`. Vowels carry a stress digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phoneme(String);

impl Phoneme {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stress level 0, 1 or 2 for vowels; `None` for consonants.
    pub fn stress(&self) -> Option<u8> {
        let last = *self.0.as_bytes().last()?;
        last.is_ascii_digit().then(|| last - b'0')
    }

    /// Vowel phones are exactly the symbols with a stress digit.
    pub fn is_vowel(&self) -> bool {
        self.stress().is_some()
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Phoneme {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

pub type PhonemeSequence = Vec<Phoneme>;

/// Build a sequence from whitespace-separated symbols (`"K AE1 T"`).
pub fn phonemes(symbols: &str) -> PhonemeSequence {
    symbols.split_whitespace().map(Phoneme::from).collect()
}

/// Lowercase, trim and strip punctuation that never appears in dictionary keys.
pub fn normalize_word(word: &str) -> String {
    word.trim()
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .to_lowercase()
}
