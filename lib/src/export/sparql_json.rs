//! SPARQL 1.1 Query Results JSON.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::errors::Result;
use crate::export::binding::{Binding, decode_cell};
use crate::export::rows::RowFormatter;
use crate::export::sparql_xml::bare_name;
use crate::result::ResultBlock;
use crate::vocabulary::Vocabulary;

pub(crate) fn binding_object(binding: Binding<'_>) -> Value {
    let mut object = Map::new();
    match binding {
        Binding::Uri(iri) => {
            object.insert("type".into(), json!("uri"));
            object.insert("value".into(), json!(iri));
        }
        Binding::BlankNode(label) => {
            object.insert("type".into(), json!("bnode"));
            object.insert("value".into(), json!(label));
        }
        Binding::Literal {
            value,
            lang,
            datatype,
        } => {
            object.insert("type".into(), json!("literal"));
            object.insert("value".into(), json!(value));
            if let Some(lang) = lang {
                object.insert("xml:lang".into(), json!(lang));
            } else if let Some(datatype) = datatype {
                object.insert("datatype".into(), json!(datatype));
            }
        }
    }
    Value::Object(object)
}

pub(crate) fn boolean_document(answer: bool) -> String {
    json!({"head": {}, "boolean": answer}).to_string()
}

pub(crate) struct JsonRows {
    names: Vec<String>,
    columns: Vec<Option<usize>>,
    vocabulary: Arc<dyn Vocabulary>,
    first: bool,
}

impl JsonRows {
    pub(crate) fn new(
        variables: &[String],
        columns: Vec<Option<usize>>,
        vocabulary: Arc<dyn Vocabulary>,
    ) -> Self {
        JsonRows {
            names: variables.iter().map(|v| bare_name(v).to_string()).collect(),
            columns,
            vocabulary,
            first: true,
        }
    }
}

impl RowFormatter for JsonRows {
    fn header(&mut self) -> Result<Vec<u8>> {
        let vars = serde_json::to_string(&self.names)?;
        Ok(format!("{{\"head\":{{\"vars\":{}}},\"results\":{{\"bindings\":[", vars).into_bytes())
    }

    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>> {
        let mut object = Map::new();
        for (name, column) in self.names.iter().zip(&self.columns) {
            if let Some((text, xsd)) = decode_cell(self.vocabulary.as_ref(), block, row, *column)? {
                object.insert(name.clone(), binding_object(Binding::classify(&text, xsd)));
            }
        }
        let mut out = if self.first {
            Vec::new()
        } else {
            b",".to_vec()
        };
        self.first = false;
        serde_json::to_writer(&mut out, &Value::Object(object))?;
        Ok(out)
    }

    fn footer(&mut self, _counted_rows: u64) -> Result<Vec<u8>> {
        Ok(b"]}}".to_vec())
    }
}
