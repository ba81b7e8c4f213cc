//! Folding parsed RDF terms into encoded values.
//!
//! Numbers, booleans, dates and WKT points are stored inline. IRIs found in
//! the vocabulary become vocabulary indices; all other IRIs and literals are
//! added to a local vocab. Blank nodes draw fresh ids from the blank node
//! manager, one id per distinct label.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use oxigraph::model::{LiteralRef, TermRef};
use valueid::{DateValue, GeoPoint, TaggedValue};

use crate::blank_nodes::{BlankNodeManager, LocalBlankNodeManager};
use crate::consts::{
    GEO_WKT_LITERAL, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_FLOAT, XSD_INT, XSD_INTEGER,
    XSD_LONG,
};
use crate::errors::{ExportError, Result};
use crate::local_vocab::LocalVocab;
use crate::term::LiteralOrIri;
use crate::vocabulary::InMemoryVocabulary;

pub struct TermEncoder {
    vocabulary: Option<Arc<InMemoryVocabulary>>,
    local_vocab: LocalVocab,
    blank_nodes: LocalBlankNodeManager,
    labels: HashMap<String, TaggedValue>,
}

impl TermEncoder {
    pub fn new(blank_nodes: Arc<BlankNodeManager>) -> Self {
        TermEncoder {
            vocabulary: None,
            local_vocab: LocalVocab::new(),
            blank_nodes: LocalBlankNodeManager::new(blank_nodes),
            labels: HashMap::new(),
        }
    }

    /// Look terms up in `vocabulary` before falling back to the local vocab.
    pub fn with_vocabulary(mut self, vocabulary: Arc<InMemoryVocabulary>) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn encode_term(&mut self, term: TermRef<'_>) -> Result<TaggedValue> {
        match term {
            TermRef::NamedNode(iri) => self.encode_word(LiteralOrIri::Iri(iri.into_owned())),
            TermRef::BlankNode(node) => self.encode_blank_node(node.as_str()),
            TermRef::Literal(literal) => self.encode_literal(literal),
            #[allow(unreachable_patterns)]
            _ => Err(ExportError::Execution(format!(
                "cannot encode term {}",
                term
            ))),
        }
    }

    pub fn encode_literal(&mut self, literal: LiteralRef<'_>) -> Result<TaggedValue> {
        if literal.language().is_none() {
            if let Some(value) = inline_value(literal) {
                trace!("encoded {} inline as {}", literal, value);
                return Ok(value);
            }
        }
        self.encode_word(LiteralOrIri::Literal(literal.into_owned()))
    }

    fn encode_word(&mut self, word: LiteralOrIri) -> Result<TaggedValue> {
        if let Some(index) = self.vocabulary.as_ref().and_then(|v| v.index_of(&word)) {
            return Ok(TaggedValue::from_vocab_index(index)?);
        }
        let index = self.local_vocab.get_index_and_add_if_not_contained(word);
        Ok(TaggedValue::from_local_vocab_index(index)?)
    }

    fn encode_blank_node(&mut self, label: &str) -> Result<TaggedValue> {
        if let Some(value) = self.labels.get(label) {
            return Ok(*value);
        }
        let value = self.blank_nodes.next_blank_node()?;
        self.labels.insert(label.to_string(), value);
        Ok(value)
    }

    pub fn local_vocab(&self) -> &LocalVocab {
        &self.local_vocab
    }

    /// The collected local vocab and the scope owning the issued blank node
    /// ids; the ids stay reserved while the scope is alive.
    pub fn finish(self) -> (LocalVocab, LocalBlankNodeManager) {
        (self.local_vocab, self.blank_nodes)
    }
}

/// The inline encoding of a typed literal, if its datatype has one and the
/// lexical form is valid for it.
fn inline_value(literal: LiteralRef<'_>) -> Option<TaggedValue> {
    let lexical = literal.value().trim();
    let datatype = literal.datatype();
    if datatype == XSD_INT || datatype == XSD_INTEGER || datatype == XSD_LONG {
        let i: i64 = lexical.parse().ok()?;
        let value = TaggedValue::from_int(i);
        // Integers that do not fit the payload stay exact in the local vocab.
        return (value.get_int() == i).then_some(value);
    }
    if datatype == XSD_DECIMAL || datatype == XSD_DOUBLE || datatype == XSD_FLOAT {
        return match lexical {
            "INF" => Some(TaggedValue::from_double(f64::INFINITY)),
            "-INF" => Some(TaggedValue::from_double(f64::NEG_INFINITY)),
            "NaN" => Some(TaggedValue::from_double(f64::NAN)),
            _ => lexical.parse().ok().map(TaggedValue::from_double),
        };
    }
    if datatype == XSD_BOOLEAN {
        return match lexical {
            "true" => Some(TaggedValue::from_bool(true)),
            "false" => Some(TaggedValue::from_bool(false)),
            "1" => Some(TaggedValue::bool_from_zero_or_one(true)),
            "0" => Some(TaggedValue::bool_from_zero_or_one(false)),
            _ => None,
        };
    }
    if datatype == GEO_WKT_LITERAL {
        return GeoPoint::parse_wkt(lexical)
            .ok()
            .map(TaggedValue::from_geo_point);
    }
    DateValue::parse_xsd(lexical, datatype.as_str())
        .ok()
        .map(TaggedValue::from_date)
}
