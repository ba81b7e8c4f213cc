use std::collections::HashMap;

use crate::term::LiteralOrIri;

/// Per-query table of terms that are not in the global vocabulary.
///
/// Indices are assigned in insertion order and never change. Once a vocab is
/// shared with result blocks (behind an `Arc`) it is no longer mutated.
#[derive(Debug, Default, Clone)]
pub struct LocalVocab {
    words: Vec<LiteralOrIri>,
    indices: HashMap<LiteralOrIri, u64>,
}

impl LocalVocab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `word`, inserting it first if it is new.
    pub fn get_index_and_add_if_not_contained(&mut self, word: LiteralOrIri) -> u64 {
        if let Some(&index) = self.indices.get(&word) {
            return index;
        }
        let index = self.words.len() as u64;
        self.words.push(word.clone());
        self.indices.insert(word, index);
        index
    }

    pub fn get_index(&self, word: &LiteralOrIri) -> Option<u64> {
        self.indices.get(word).copied()
    }

    pub fn get_word(&self, index: u64) -> Option<&LiteralOrIri> {
        usize::try_from(index).ok().and_then(|i| self.words.get(i))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
