//! Lookup interface for the global string tables.

use std::borrow::Cow;

use crate::term::LiteralOrIri;

/// Read-only access to the vocabularies that index-bearing values point into.
pub trait Vocabulary: Send + Sync {
    /// String representation (`<iri>`, `"lex"@lang`, ...) of a `VocabIndex`.
    fn index_to_string(&self, index: u64) -> Option<Cow<'_, str>>;
    /// Entry of the text word vocabulary for a `WordVocabIndex`.
    fn word(&self, index: u64) -> Option<Cow<'_, str>>;
    /// Excerpt of the text record behind a `TextRecordIndex`.
    fn text_excerpt(&self, index: u64) -> Option<Cow<'_, str>>;
}

/// A vocabulary held fully in memory; terms are sorted by their string representation.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVocabulary {
    terms: Vec<String>,
    words: Vec<String>,
    texts: Vec<String>,
}

impl InMemoryVocabulary {
    /// Build from arbitrary terms; duplicates are removed.
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = LiteralOrIri>,
    {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.to_string_representation())
            .collect();
        terms.sort();
        terms.dedup();
        InMemoryVocabulary {
            terms,
            words: Vec::new(),
            texts: Vec::new(),
        }
    }

    pub fn with_words(mut self, words: Vec<String>) -> Self {
        self.words = words;
        self
    }

    pub fn with_text_records(mut self, texts: Vec<String>) -> Self {
        self.texts = texts;
        self
    }

    /// Index of a term, if present.
    pub fn index_of(&self, term: &LiteralOrIri) -> Option<u64> {
        self.terms
            .binary_search(&term.to_string_representation())
            .ok()
            .map(|i| i as u64)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn lookup(table: &[String], index: u64) -> Option<Cow<'_, str>> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .map(|s| Cow::Borrowed(s.as_str()))
}

impl Vocabulary for InMemoryVocabulary {
    fn index_to_string(&self, index: u64) -> Option<Cow<'_, str>> {
        lookup(&self.terms, index)
    }

    fn word(&self, index: u64) -> Option<Cow<'_, str>> {
        lookup(&self.words, index)
    }

    fn text_excerpt(&self, index: u64) -> Option<Cow<'_, str>> {
        lookup(&self.texts, index)
    }
}
