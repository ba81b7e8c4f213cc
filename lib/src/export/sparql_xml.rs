//! SPARQL 1.1 Query Results XML.

use std::sync::Arc;

use crate::consts::SPARQL_RESULTS_NS;
use crate::errors::Result;
use crate::export::binding::{Binding, decode_cell};
use crate::export::rows::RowFormatter;
use crate::result::ResultBlock;
use crate::util::escape_for_xml;
use crate::vocabulary::Vocabulary;

pub(crate) fn document_start() -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<sparql xmlns=\"{}\">",
        SPARQL_RESULTS_NS
    )
}

pub(crate) fn boolean_document(answer: bool) -> String {
    format!(
        "{}\n  <head/>\n  <boolean>{}</boolean>\n</sparql>",
        document_start(),
        answer
    )
}

fn escape(s: &str) -> String {
    escape_for_xml(s.to_string())
}

pub(crate) fn binding_element(name: &str, binding: Binding<'_>) -> String {
    let inner = match binding {
        Binding::Uri(iri) => format!("<uri>{}</uri>", escape(iri)),
        Binding::BlankNode(label) => format!("<bnode>{}</bnode>", escape(label)),
        Binding::Literal {
            value,
            lang: Some(lang),
            ..
        } => format!(
            "<literal xml:lang=\"{}\">{}</literal>",
            escape(lang),
            escape(value)
        ),
        Binding::Literal {
            value,
            datatype: Some(datatype),
            ..
        } => format!(
            "<literal datatype=\"{}\">{}</literal>",
            escape(datatype),
            escape(value)
        ),
        Binding::Literal { value, .. } => format!("<literal>{}</literal>", escape(value)),
    };
    format!("\n    <binding name=\"{}\">{}</binding>", escape(name), inner)
}

pub(crate) struct XmlRows {
    names: Vec<String>,
    columns: Vec<Option<usize>>,
    vocabulary: Arc<dyn Vocabulary>,
}

impl XmlRows {
    pub(crate) fn new(
        variables: &[String],
        columns: Vec<Option<usize>>,
        vocabulary: Arc<dyn Vocabulary>,
    ) -> Self {
        XmlRows {
            names: variables.iter().map(|v| bare_name(v).to_string()).collect(),
            columns,
            vocabulary,
        }
    }
}

pub(crate) fn bare_name(variable: &str) -> &str {
    variable
        .strip_prefix('?')
        .or_else(|| variable.strip_prefix('$'))
        .unwrap_or(variable)
}

impl RowFormatter for XmlRows {
    fn header(&mut self) -> Result<Vec<u8>> {
        let mut out = document_start();
        out.push_str("\n<head>");
        for name in &self.names {
            out.push_str(&format!("\n  <variable name=\"{}\"/>", escape(name)));
        }
        out.push_str("\n</head>\n<results>");
        Ok(out.into_bytes())
    }

    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>> {
        let mut out = String::from("\n  <result>");
        for (name, column) in self.names.iter().zip(&self.columns) {
            let Some((text, xsd)) = decode_cell(self.vocabulary.as_ref(), block, row, *column)?
            else {
                continue;
            };
            out.push_str(&binding_element(name, Binding::classify(&text, xsd)));
        }
        out.push_str("\n  </result>");
        Ok(out.into_bytes())
    }

    fn footer(&mut self, _counted_rows: u64) -> Result<Vec<u8>> {
        Ok(b"\n</results>\n</sparql>".to_vec())
    }
}
