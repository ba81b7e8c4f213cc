//! ASK results: a single boolean.

use log::debug;
use serde_json::json;
use valueid::xsd::XSD_BOOLEAN;

use crate::cancellation::CancellationHandle;
use crate::errors::Result;
use crate::export::envelope::{EnvelopeInfo, envelope_prefix, envelope_suffix};
use crate::export::{MediaType, sparql_json, sparql_xml};
use crate::pager::RowCount;
use crate::result::QueryResult;

/// `true` as soon as a block with at least one row shows up; later blocks are never pulled.
pub(crate) fn evaluate(result: QueryResult, cancellation: &CancellationHandle) -> Result<bool> {
    for block in result.blocks() {
        let block = block?;
        if block.num_rows() > 0 {
            return Ok(true);
        }
        cancellation.check("evaluating ASK")?;
    }
    Ok(false)
}

pub(crate) fn render(answer: bool, media_type: MediaType, info: &EnvelopeInfo) -> Result<String> {
    debug!("ASK answered {}", answer);
    match media_type {
        MediaType::SparqlXml => Ok(sparql_xml::boolean_document(answer)),
        MediaType::SparqlJson => Ok(sparql_json::boolean_document(answer)),
        _ => {
            let value = json!([[format!("\"{}\"^^<{}>", answer, XSD_BOOLEAN)]]);
            let res = serde_json::to_string(&value)?;
            // `res` is an array of arrays; the envelope supplies the outer brackets.
            let inner = &res[1..res.len() - 1];
            Ok(format!(
                "{}{}{}",
                envelope_prefix(info)?,
                inner,
                envelope_suffix(info, 1, 1)?
            ))
        }
    }
}
