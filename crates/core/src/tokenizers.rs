//! Text tokenizers
//!
//! Provides the `Tokenizer` trait used to split text into lines or words, and
//! the `TokenTable` that maps each distinct unit to a compact integer id so a
//! single sequence-diff routine serves every granularity.

use crate::cleanup::boundary_score;
use crate::error::{DiffError, Result};
use rustc_hash::FxHashMap;

/// Trait for tokenizers that split text into diffable units
///
/// Concatenating the units returned by `split` must reproduce the input.
pub trait Tokenizer: Send + Sync {
    /// Split `text` into units
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str>;

    /// Get the name of this tokenizer
    fn name(&self) -> &str;
}

/// Line tokenizer (each line keeps its trailing newline)
#[derive(Debug, Clone, Copy, Default)]
pub struct LineTokenizer;

impl Tokenizer for LineTokenizer {
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.split_inclusive('\n').collect()
    }

    fn name(&self) -> &str {
        "line"
    }
}

/// Word tokenizer
///
/// Runs of characters other than space and newline form one token. Every
/// space and every newline is a token of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    fn is_separator(ch: char) -> bool {
        ch == ' ' || ch == '\n'
    }
}

impl Tokenizer for WordTokenizer {
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut tokens = Vec::new();
        let mut word_start: Option<usize> = None;

        for (pos, ch) in text.char_indices() {
            if Self::is_separator(ch) {
                if let Some(start) = word_start.take() {
                    tokens.push(&text[start..pos]);
                }
                tokens.push(&text[pos..pos + ch.len_utf8()]);
            } else if word_start.is_none() {
                word_start = Some(pos);
            }
        }

        if let Some(start) = word_start {
            tokens.push(&text[start..]);
        }

        tokens
    }

    fn name(&self) -> &str {
        "word"
    }
}

/// Reverse lookup from synthetic ids to the units they stand for
///
/// Ids are assigned in first-seen order and shared between both sides of a
/// diff, so equal units always carry equal ids.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    units: Vec<String>,
    ids: FxHashMap<String, u32>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `unit`, allocating one on first sight
    pub fn intern(&mut self, unit: &str) -> u32 {
        if let Some(&id) = self.ids.get(unit) {
            return id;
        }
        let id = u32::try_from(self.units.len()).unwrap_or(u32::MAX);
        self.units.push(unit.to_string());
        self.ids.insert(unit.to_string(), id);
        id
    }

    /// Encode every unit of `text`
    pub fn encode(&mut self, text: &str, tokenizer: &dyn Tokenizer) -> Vec<u32> {
        tokenizer
            .split(text)
            .into_iter()
            .map(|unit| self.intern(unit))
            .collect()
    }

    /// The unit behind `id`
    pub fn decode(&self, id: u32) -> Result<&str> {
        self.units
            .get(id as usize)
            .map(String::as_str)
            .ok_or(DiffError::UnknownToken { id })
    }

    /// Concatenated text of a token sequence
    pub fn decode_all(&self, ids: &[u32]) -> Result<String> {
        let mut text = String::new();
        for &id in ids {
            text.push_str(self.decode(id)?);
        }
        Ok(text)
    }

    /// Boundary quality between two token sequences
    ///
    /// Only the two units on each side of the boundary are inspected, which
    /// is all `boundary_score` looks at.
    pub fn boundary(&self, one: &[u32], two: &[u32]) -> u8 {
        let tail_start = one.len().saturating_sub(2);
        let head_end = two.len().min(2);
        let tail = self.lossy_text(&one[tail_start..]);
        let head = self.lossy_text(&two[..head_end]);
        boundary_score(&tail, &head)
    }

    fn lossy_text(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter_map(|&id| self.units.get(id as usize))
            .map(String::as_str)
            .collect()
    }

    /// Number of distinct units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Both sides of a diff encoded against one shared table
#[derive(Debug, Clone)]
pub struct EncodedPair {
    pub left: Vec<u32>,
    pub right: Vec<u32>,
    pub table: TokenTable,
}

impl EncodedPair {
    /// Total number of tokens on both sides
    pub fn total_len(&self) -> usize {
        self.left.len() + self.right.len()
    }
}

/// Encode two texts with a shared table
pub fn encode_pair(left: &str, right: &str, tokenizer: &dyn Tokenizer) -> EncodedPair {
    let mut table = TokenTable::new();
    let left = table.encode(left, tokenizer);
    let right = table.encode(right, tokenizer);
    EncodedPair { left, right, table }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_tokenizer() {
        let lines = LineTokenizer.split("a\nb\n\nc");
        assert_eq!(lines, vec!["a\n", "b\n", "\n", "c"]);
        assert!(LineTokenizer.split("").is_empty());
    }

    #[test]
    fn test_word_tokenizer() {
        let words = WordTokenizer.split("hello  big\nworld");
        assert_eq!(words, vec!["hello", " ", " ", "big", "\n", "world"]);
        assert_eq!(words.concat(), "hello  big\nworld");
    }

    #[test]
    fn test_word_tokenizer_keeps_punctuation_attached() {
        let words = WordTokenizer.split("fn main() {\n");
        assert_eq!(words, vec!["fn", " ", "main()", " ", "{", "\n"]);
    }

    #[test]
    fn test_shared_ids() {
        let pair = encode_pair("a\nb\na\n", "b\nc\n", &LineTokenizer);
        assert_eq!(pair.left, vec![0, 1, 0]);
        assert_eq!(pair.right, vec![1, 2]);
        assert_eq!(pair.table.len(), 3);
        assert_eq!(pair.total_len(), 5);
        assert_eq!(pair.table.decode_all(&pair.right).unwrap(), "b\nc\n");
    }

    #[test]
    fn test_unknown_token() {
        let table = TokenTable::new();
        assert_eq!(table.decode(3), Err(DiffError::UnknownToken { id: 3 }));
    }
}
