//! The engine's own JSON format: one object with the query, its selected
//! variables, the bindings under `res`, sizes and timings.
//!
//! The object is streamed: everything before `res` is written as the
//! header, the bindings as they are produced, and the sizes (only known at
//! the end) as the footer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use serde_json::{Map, Value, json};

use crate::errors::{ExportError, Result};
use crate::export::binding::decode_cell;
use crate::export::rows::RowFormatter;
use crate::result::ResultBlock;
use crate::vocabulary::Vocabulary;

/// Everything in the envelope except the bindings and sizes.
#[derive(Debug, Clone)]
pub(crate) struct EnvelopeInfo {
    pub query: String,
    pub selected: Vec<String>,
    pub warnings: Vec<String>,
    pub runtime_information: Value,
    pub compute_time: Duration,
    pub started: Instant,
}

fn millis(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}

/// Serialize `object` without its closing brace.
fn open_object(object: Map<String, Value>) -> Result<String> {
    let mut text = serde_json::to_string(&Value::Object(object))?;
    text.pop();
    Ok(text)
}

pub(crate) fn envelope_prefix(info: &EnvelopeInfo) -> Result<String> {
    let mut object = Map::new();
    object.insert("query".into(), json!(info.query));
    object.insert("selected".into(), json!(info.selected));
    object.insert("status".into(), json!("OK"));
    object.insert("warnings".into(), json!(info.warnings));
    let mut prefix = open_object(object)?;
    prefix.push_str(",\"res\":[");
    Ok(prefix)
}

pub(crate) fn envelope_suffix(info: &EnvelopeInfo, exported: u64, total: u64) -> Result<String> {
    if exported < total {
        info!("Number of bindings exported: {} of {}", exported, total);
    }
    let mut object = Map::new();
    object.insert("resultSizeExported".into(), json!(exported));
    object.insert("resultSizeTotal".into(), json!(total));
    object.insert("resultsize".into(), json!(total));
    object.insert("runtimeInformation".into(), info.runtime_information.clone());
    object.insert(
        "time".into(),
        json!({
            "computeResult": millis(info.compute_time),
            "total": millis(info.started.elapsed()),
        }),
    );
    let body = serde_json::to_string(&Value::Object(object))?;
    let body = body.strip_prefix('{').ok_or_else(|| {
        ExportError::Execution("envelope suffix is not a JSON object".to_string())
    })?;
    Ok(format!("],{}", body))
}

/// Source of the JSON bindings of one row.
pub(crate) trait JsonBindings: Send {
    fn bindings(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<Value>>;

    /// Size reported as `resultSizeTotal` for `counted_rows` rows.
    fn total(&self, counted_rows: u64) -> u64 {
        counted_rows
    }

    fn checks_cancellation(&self) -> bool {
        false
    }
}

pub(crate) struct EnvelopeRows<B> {
    info: EnvelopeInfo,
    bindings: B,
    exported: u64,
}

impl<B: JsonBindings> EnvelopeRows<B> {
    pub(crate) fn new(info: EnvelopeInfo, bindings: B) -> Self {
        EnvelopeRows {
            info,
            bindings,
            exported: 0,
        }
    }
}

impl<B: JsonBindings> RowFormatter for EnvelopeRows<B> {
    fn header(&mut self) -> Result<Vec<u8>> {
        Ok(envelope_prefix(&self.info)?.into_bytes())
    }

    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for binding in self.bindings.bindings(block, row)? {
            if self.exported > 0 {
                out.push(b',');
            }
            serde_json::to_writer(&mut out, &binding)?;
            self.exported += 1;
        }
        Ok(out)
    }

    fn footer(&mut self, counted_rows: u64) -> Result<Vec<u8>> {
        let total = self.bindings.total(counted_rows);
        Ok(envelope_suffix(&self.info, self.exported, total)?.into_bytes())
    }

    fn checks_cancellation(&self) -> bool {
        self.bindings.checks_cancellation()
    }
}

/// SELECT rows as arrays, one entry per selected variable.
pub(crate) struct SelectBindings {
    columns: Vec<Option<usize>>,
    vocabulary: Arc<dyn Vocabulary>,
}

impl SelectBindings {
    pub(crate) fn new(columns: Vec<Option<usize>>, vocabulary: Arc<dyn Vocabulary>) -> Self {
        SelectBindings {
            columns,
            vocabulary,
        }
    }
}

impl JsonBindings for SelectBindings {
    fn bindings(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = match decode_cell(self.vocabulary.as_ref(), block, row, *column)? {
                None => Value::Null,
                Some((text, Some(xsd))) => json!(format!("\"{}\"^^<{}>", text, xsd)),
                Some((text, None)) => json!(text),
            };
            values.push(value);
        }
        Ok(vec![Value::Array(values)])
    }
}
