//! Read-only pronunciation dictionary in CMUdict format.
//!
//! ```text
//! ;;; comment lines start with three semicolons
//! CAT  K AE1 T
//! EITHER  IY1 DH ER0
//! EITHER(2)  AY1 DH ER0   # trailing comments are ignored
//! ```
//!
//! Alternates (`WORD(2)`, `WORD(3)`, …) are appended to the base word's
//! variant list in file order. Order is preserved but carries no ranking.
//!
//! The dictionary is built once and shared (`Arc`) between threads; there is
//! no interior mutability, so concurrent lookups need no locking.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use super::{normalize_word, Phoneme, PhonemeSequence};
use crate::error::{Result, ScoreError};

#[derive(Debug, Clone, Default)]
pub struct PronunciationDictionary {
    entries: HashMap<String, Vec<PhonemeSequence>>,
}

impl PronunciationDictionary {
    /// Load a CMUdict-format file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        // CMUdict ships as Latin-1 in some distributions.
        let text = String::from_utf8_lossy(&raw);
        let dict = Self::parse(&text)?;
        info!(
            path = %path.display(),
            words = dict.len(),
            "pronunciation dictionary loaded"
        );
        Ok(dict)
    }

    /// Parse dictionary text. Malformed lines (a word with no phonemes) are
    /// rejected with the offending line number.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries: HashMap<String, Vec<PhonemeSequence>> = HashMap::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() || line.starts_with(";;;") {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(head) = fields.next() else {
                continue;
            };
            let symbols: PhonemeSequence = fields.map(Phoneme::from).collect();
            if symbols.is_empty() {
                return Err(ScoreError::InvalidConfig(format!(
                    "dictionary line {}: '{head}' has no phonemes",
                    lineno + 1
                )));
            }

            let key = normalize_word(strip_variant_suffix(head));
            entries.entry(key).or_default().push(symbols);
        }

        debug!(words = entries.len(), "parsed pronunciation dictionary");
        Ok(Self { entries })
    }

    /// Build directly from `(word, variants)` pairs; handy for fixtures.
    pub fn from_entries<I, W>(entries: I) -> Self
    where
        I: IntoIterator<Item = (W, Vec<PhonemeSequence>)>,
        W: AsRef<str>,
    {
        let mut map: HashMap<String, Vec<PhonemeSequence>> = HashMap::new();
        for (word, variants) in entries {
            map.entry(normalize_word(word.as_ref()))
                .or_default()
                .extend(variants);
        }
        Self { entries: map }
    }

    /// All variants for `word` (lowercased, trimmed). Empty when unknown.
    pub fn lookup(&self, word: &str) -> &[PhonemeSequence] {
        self.entries
            .get(&normalize_word(word))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, word: &str) -> bool {
        !self.lookup(word).is_empty()
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `EITHER(2)` → `EITHER`.
fn strip_variant_suffix(head: &str) -> &str {
    match head.find('(') {
        Some(idx) if head.ends_with(')') && idx > 0 => &head[..idx],
        _ => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonetics::phonemes;

    const FIXTURE: &str = "\
;;; tiny fixture
CAT  K AE1 T
EITHER  IY1 DH ER0
EITHER(2)  AY1 DH ER0 # british
";

    #[test]
    fn parses_variants_in_file_order() {
        let dict = PronunciationDictionary::parse(FIXTURE).unwrap();
        assert_eq!(dict.len(), 2);
        let either = dict.lookup("either");
        assert_eq!(either.len(), 2);
        assert_eq!(either[0], phonemes("IY1 DH ER0"));
        assert_eq!(either[1], phonemes("AY1 DH ER0"));
    }

    #[test]
    fn lookup_normalizes_key() {
        let dict = PronunciationDictionary::parse(FIXTURE).unwrap();
        assert_eq!(dict.lookup("  CAT ").len(), 1);
        assert!(dict.contains("Cat"));
    }

    #[test]
    fn unknown_word_is_empty_not_error() {
        let dict = PronunciationDictionary::parse(FIXTURE).unwrap();
        assert!(dict.lookup("zyzzyva").is_empty());
    }

    #[test]
    fn word_without_phonemes_is_rejected() {
        let err = PronunciationDictionary::parse("CAT\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn from_entries_merges_duplicates() {
        let dict = PronunciationDictionary::from_entries([
            ("Tomato", vec![phonemes("T AH0 M EY1 T OW2")]),
            ("tomato", vec![phonemes("T AH0 M AA1 T OW2")]),
        ]);
        assert_eq!(dict.lookup("tomato").len(), 2);
    }

    #[test]
    fn load_reads_latin1_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmudict.dict");
        std::fs::write(&path, b";;; latin-1\nCAF\xc9  K AE0 F EY1\nCAT  K AE1 T\n").unwrap();

        let dict = PronunciationDictionary::load(&path).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.lookup("cat"), [phonemes("K AE1 T")]);
        // The undecodable byte is replaced and then trimmed off the key.
        assert_eq!(dict.lookup("caf"), [phonemes("K AE0 F EY1")]);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PronunciationDictionary::load(&dir.path().join("absent.dict")).unwrap_err();
        assert!(matches!(err, ScoreError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn strip_variant_suffix_keeps_plain_words() {
        assert_eq!(strip_variant_suffix("READ(2)"), "READ");
        assert_eq!(strip_variant_suffix("READ"), "READ");
        assert_eq!(strip_variant_suffix("(PAREN)"), "(PAREN)");
    }
}
