//! IRIs and literals as stored in the vocabularies.
//!
//! Terms are kept in normalized form: literal lexical values are unescaped.
//! The string representation (`<iri>`, `"lex"`, `"lex"@lang`,
//! `"lex"^^<datatype>`) is what vocabularies store and what sorting uses.

use std::fmt;

use oxigraph::model::{Literal, NamedNode};

use crate::consts::{BLANK_NODE_IRI_PREFIX, XSD_STRING};
use crate::errors::{ExportError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralOrIri {
    Iri(NamedNode),
    Literal(Literal),
}

impl LiteralOrIri {
    pub fn iri(iri: &str) -> Result<Self> {
        NamedNode::new(iri)
            .map(LiteralOrIri::Iri)
            .map_err(|e| ExportError::Vocabulary(format!("invalid IRI {}: {}", iri, e)))
    }

    pub fn plain(value: impl Into<String>) -> Self {
        LiteralOrIri::Literal(Literal::new_simple_literal(value))
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, LiteralOrIri::Iri(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, LiteralOrIri::Literal(_))
    }

    /// IRI or lexical value without quotes, brackets, language tag or datatype.
    pub fn content(&self) -> &str {
        match self {
            LiteralOrIri::Iri(iri) => iri.as_str(),
            LiteralOrIri::Literal(lit) => lit.value(),
        }
    }

    /// Label of the blank node this IRI stands for, if it is one.
    pub fn blank_node_label(&self) -> Option<&str> {
        match self {
            LiteralOrIri::Iri(iri) => iri.as_str().strip_prefix(BLANK_NODE_IRI_PREFIX),
            LiteralOrIri::Literal(_) => None,
        }
    }

    /// Datatype IRI of a typed literal; `None` for IRIs, plain and language-tagged literals.
    pub fn datatype(&self) -> Option<&str> {
        match self {
            LiteralOrIri::Literal(lit) if lit.language().is_none() => {
                let dt = lit.datatype();
                (dt != XSD_STRING).then(|| dt.as_str())
            }
            _ => None,
        }
    }

    pub fn to_string_representation(&self) -> String {
        match self {
            LiteralOrIri::Iri(iri) => format!("<{}>", iri.as_str()),
            LiteralOrIri::Literal(lit) => {
                if let Some(lang) = lit.language() {
                    format!("\"{}\"@{}", lit.value(), lang)
                } else if let Some(dt) = self.datatype() {
                    format!("\"{}\"^^<{}>", lit.value(), dt)
                } else {
                    format!("\"{}\"", lit.value())
                }
            }
        }
    }

    /// Inverse of [`LiteralOrIri::to_string_representation`].
    pub fn from_string_representation(repr: &str) -> Result<Self> {
        let bad = || ExportError::Vocabulary(format!("malformed term representation: {}", repr));
        if let Some(iri) = repr.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
            return LiteralOrIri::iri(iri);
        }
        if !repr.starts_with('"') {
            return Err(bad());
        }
        let close = repr.rfind('"').filter(|&i| i > 0).ok_or_else(bad)?;
        let value = &repr[1..close];
        let suffix = &repr[close + 1..];
        if suffix.is_empty() {
            Ok(LiteralOrIri::plain(value))
        } else if let Some(lang) = suffix.strip_prefix('@') {
            Literal::new_language_tagged_literal(value, lang)
                .map(LiteralOrIri::Literal)
                .map_err(|_| bad())
        } else if let Some(dt) = suffix
            .strip_prefix("^^<")
            .and_then(|s| s.strip_suffix('>'))
        {
            let dt = NamedNode::new(dt).map_err(|_| bad())?;
            Ok(LiteralOrIri::Literal(Literal::new_typed_literal(value, dt)))
        } else {
            Err(bad())
        }
    }
}

impl fmt::Display for LiteralOrIri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_string_representation())
    }
}
