//! Classification of decoded text into SPARQL result terms.

use crate::decode::{DecodeOptions, StringAndType, id_to_string_and_type, identity};
use crate::errors::Result;
use crate::result::ResultBlock;
use crate::vocabulary::Vocabulary;

/// Full representation of one cell, `None` when the column is absent or unbound.
pub(crate) fn decode_cell(
    vocabulary: &dyn Vocabulary,
    block: &ResultBlock,
    row: usize,
    column: Option<usize>,
) -> Result<Option<StringAndType>> {
    let Some(column) = column else {
        return Ok(None);
    };
    id_to_string_and_type(
        vocabulary,
        block.table.get(row, column),
        &block.local_vocab,
        DecodeOptions::default(),
        identity,
    )
}

/// One bound value as the SPARQL XML and JSON result formats see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    Uri(&'a str),
    BlankNode(&'a str),
    Literal {
        value: &'a str,
        lang: Option<&'a str>,
        datatype: Option<&'a str>,
    },
}

impl<'a> Binding<'a> {
    /// Classify decoder output. Values that carry an xsd type are typed
    /// literals; other text is inspected: a leading `<` is an IRI, `_:` a
    /// blank node, and a closing quote followed by `@` or `^^<...>` marks a
    /// language tag or datatype. Text without quotes (words, text records)
    /// is a plain literal.
    pub fn classify(text: &'a str, xsd_type: Option<&'a str>) -> Self {
        if let Some(datatype) = xsd_type {
            return Binding::Literal {
                value: text,
                lang: None,
                datatype: Some(datatype),
            };
        }
        if text.starts_with('<') && text.ends_with('>') && text.len() >= 2 {
            return Binding::Uri(&text[1..text.len() - 1]);
        }
        if let Some(label) = text.strip_prefix("_:") {
            return Binding::BlankNode(label);
        }
        let plain = Binding::Literal {
            value: text,
            lang: None,
            datatype: None,
        };
        if !text.starts_with('"') {
            return plain;
        }
        let Some(close) = text.rfind('"').filter(|&i| i > 0) else {
            return plain;
        };
        let value = &text[1..close];
        let rest = &text[close + 1..];
        if let Some(lang) = rest.strip_prefix('@') {
            Binding::Literal {
                value,
                lang: Some(lang),
                datatype: None,
            }
        } else if let Some(dt) = rest.strip_prefix("^^<").and_then(|r| r.strip_suffix('>')) {
            Binding::Literal {
                value,
                lang: None,
                datatype: Some(dt),
            }
        } else {
            Binding::Literal {
                value,
                lang: None,
                datatype: None,
            }
        }
    }
}
