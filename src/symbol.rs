//! Symbol model: one position of the word under rewrite.
//!
//! A sequence is either plain text (each `char` is one symbol) or a list of
//! structured [`SymbolEntry`] values carrying numeric parameters and
//! arbitrary metadata, as used by parametric L-Systems. The two
//! representations are the two variants of [`Sequence`]; every rewrite pass
//! keeps its output homogeneous by coercing appended results to the
//! representation of the accumulator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────
// SymbolEntry
// ─────────────────────────────────────────────

/// One structured position of a sequence: a symbol plus optional numeric
/// parameters and arbitrary extra fields.
///
/// Extra fields survive serialization round-trips unchanged; productions may
/// read and rewrite them freely between generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub symbol: char,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SymbolEntry {
    pub fn new(symbol: char) -> Self {
        Self { symbol, params: Vec::new(), extra: Map::new() }
    }

    pub fn with_params(symbol: char, params: Vec<f64>) -> Self {
        Self { symbol, params, extra: Map::new() }
    }
}

impl From<char> for SymbolEntry {
    fn from(symbol: char) -> Self {
        Self::new(symbol)
    }
}

// ─────────────────────────────────────────────
// Sequence
// ─────────────────────────────────────────────

/// The word under rewrite: plain text or structured entries.
///
/// Serializes untagged — text as a JSON string, entries as a JSON array —
/// matching the raw accessor format of [`Sequence::to_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sequence {
    Text(String),
    Entries(Vec<SymbolEntry>),
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence::Text(String::new())
    }
}

impl Sequence {
    /// Number of symbols (not bytes) in the sequence.
    pub fn len(&self) -> usize {
        match self {
            Sequence::Text(s) => s.chars().count(),
            Sequence::Entries(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Sequence::Text(s) => s.is_empty(),
            Sequence::Entries(v) => v.is_empty(),
        }
    }

    /// The bare symbols, in order. Used by the context matcher, which only
    /// compares symbols and never looks at params.
    pub fn tokens(&self) -> Vec<char> {
        match self {
            Sequence::Text(s) => s.chars().collect(),
            Sequence::Entries(v) => v.iter().map(|e| e.symbol).collect(),
        }
    }

    /// Coerce a text sequence into structured entries (one bare entry per
    /// symbol). Structured sequences pass through unchanged.
    pub fn into_entries(self) -> Sequence {
        match self {
            Sequence::Text(s) => {
                Sequence::Entries(s.chars().map(SymbolEntry::new).collect())
            }
            entries @ Sequence::Entries(_) => entries,
        }
    }

    /// The raw form of the sequence as JSON: a string for text, an array of
    /// entry objects for structured sequences.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Append another sequence, coercing it to this sequence's
    /// representation: entries flatten to their symbols inside text, text
    /// expands to bare entries inside a structured sequence.
    pub(crate) fn append(&mut self, other: &Sequence) {
        match (self, other) {
            (Sequence::Text(acc), Sequence::Text(s)) => acc.push_str(s),
            (Sequence::Text(acc), Sequence::Entries(v)) => {
                for e in v {
                    acc.push(e.symbol);
                }
            }
            (Sequence::Entries(acc), Sequence::Text(s)) => {
                acc.extend(s.chars().map(SymbolEntry::new));
            }
            (Sequence::Entries(acc), Sequence::Entries(v)) => {
                acc.extend(v.iter().cloned());
            }
        }
    }

    pub(crate) fn push_entry(&mut self, entry: SymbolEntry) {
        match self {
            Sequence::Text(acc) => acc.push(entry.symbol),
            Sequence::Entries(acc) => acc.push(entry),
        }
    }
}

/// The symbol string of the sequence (params and extra fields elided).
impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Text(s) => f.write_str(s),
            Sequence::Entries(v) => {
                for e in v {
                    write!(f, "{}", e.symbol)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Sequence {
    fn from(s: &str) -> Self {
        Sequence::Text(s.to_owned())
    }
}

impl From<String> for Sequence {
    fn from(s: String) -> Self {
        Sequence::Text(s)
    }
}

impl From<char> for Sequence {
    fn from(c: char) -> Self {
        Sequence::Text(c.to_string())
    }
}

impl From<SymbolEntry> for Sequence {
    fn from(e: SymbolEntry) -> Self {
        Sequence::Entries(vec![e])
    }
}

impl From<Vec<SymbolEntry>> for Sequence {
    fn from(v: Vec<SymbolEntry>) -> Self {
        Sequence::Entries(v)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_counts_symbols_not_bytes() {
        let seq = Sequence::from("⚣⚤●");
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn display_renders_entry_symbols() {
        let seq = Sequence::Entries(vec![
            SymbolEntry::with_params('A', vec![1.0, 2.0]),
            SymbolEntry::new('B'),
        ]);
        assert_eq!(seq.to_string(), "AB");
    }

    #[test]
    fn into_entries_expands_text() {
        let seq = Sequence::from("FG").into_entries();
        match seq {
            Sequence::Entries(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].symbol, 'F');
                assert!(v[0].params.is_empty());
            }
            Sequence::Text(_) => panic!("expected entries"),
        }
    }

    #[test]
    fn append_coerces_entries_into_text() {
        let mut acc = Sequence::from("A");
        acc.append(&Sequence::Entries(vec![SymbolEntry::new('B')]));
        assert_eq!(acc, Sequence::from("AB"));
    }

    #[test]
    fn append_coerces_text_into_entries() {
        let mut acc = Sequence::Entries(vec![SymbolEntry::new('A')]);
        acc.append(&Sequence::from("BC"));
        assert_eq!(acc.to_string(), "ABC");
        assert!(matches!(acc, Sequence::Entries(ref v) if v.len() == 3));
    }

    #[test]
    fn json_round_trip_preserves_params_and_extra() {
        let mut entry = SymbolEntry::with_params('F', vec![0.5]);
        entry.extra.insert("age".into(), serde_json::json!(3));
        let seq = Sequence::Entries(vec![entry]);

        let json = seq.to_json().unwrap();
        let back: Sequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);
    }

    #[test]
    fn text_serializes_as_plain_string() {
        let seq = Sequence::from("F+F");
        assert_eq!(seq.to_json().unwrap(), "\"F+F\"");
    }
}
