//! Serialization of query results into the supported output formats.
//!
//! [`compute_result`] picks the serializer for a query form and media type
//! and wraps it in an [`ExportStream`]. Every serializer is a lazy
//! iterator of byte pieces: rows are paged, decoded and formatted only as
//! the consumer pulls chunks.

mod ask;
mod binary;
pub mod binding;
pub mod construct;
mod delimited;
mod envelope;
mod rows;
mod sparql_json;
mod sparql_xml;
pub mod stream;

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::config::ExportConfig;
use crate::context::ExecutionContext;
use crate::errors::{ExportError, Result};
use crate::pager::PageWindow;
use crate::result::QueryResult;
use crate::util::truncate_operation_string;

pub use binding::Binding;
pub use construct::{
    ConstructRow, DecodingEvaluator, TemplateTerm, TemplateTriple, TriplePosition,
    VariableEvaluator,
};
pub use stream::{Chunk, ExportStream, Pieces, StreamEnd};

use binary::BinaryRows;
use construct::{TripleBindings, TripleRows, TripleSource, TripleSyntax};
use delimited::{Delimiter, DelimitedRows};
use envelope::{EnvelopeInfo, EnvelopeRows, SelectBindings};
use rows::{FramedRows, RowCursor, RowFormatter};
use sparql_json::JsonRows;
use sparql_xml::XmlRows;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Csv,
    Tsv,
    SparqlXml,
    SparqlJson,
    /// The encoded words, eight bytes per value.
    Binary,
    Turtle,
    /// The engine's own JSON envelope.
    InternalJson,
}

impl MediaType {
    pub const ALL: [MediaType; 7] = [
        MediaType::Csv,
        MediaType::Tsv,
        MediaType::SparqlXml,
        MediaType::SparqlJson,
        MediaType::Binary,
        MediaType::Turtle,
        MediaType::InternalJson,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MediaType::Csv => "csv",
            MediaType::Tsv => "tsv",
            MediaType::SparqlXml => "sparql-xml",
            MediaType::SparqlJson => "sparql-json",
            MediaType::Binary => "octet-stream",
            MediaType::Turtle => "turtle",
            MediaType::InternalJson => "qlever-json",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Csv => "text/csv",
            MediaType::Tsv => "text/tab-separated-values",
            MediaType::SparqlXml => "application/sparql-results+xml",
            MediaType::SparqlJson => "application/sparql-results+json",
            MediaType::Binary => "application/octet-stream",
            MediaType::Turtle => "text/turtle",
            MediaType::InternalJson => "application/qlever-results+json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Csv => "csv",
            MediaType::Tsv => "tsv",
            MediaType::SparqlXml => "srx",
            MediaType::SparqlJson => "srj",
            MediaType::Binary => "bin",
            MediaType::Turtle => "ttl",
            MediaType::InternalJson => "json",
        }
    }

    /// Match a mime type, ignoring parameters such as `; charset=utf-8`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        MediaType::ALL
            .into_iter()
            .find(|m| m.mime().eq_ignore_ascii_case(essence))
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        MediaType::ALL
            .into_iter()
            .find(|m| m.extension().eq_ignore_ascii_case(extension))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaType {
    type Err = ExportError;

    /// Accepts format names (`csv`, `sparql-json`, ...), a few short
    /// aliases and mime types.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let by_alias = match lower.as_str() {
            "xml" => Some(MediaType::SparqlXml),
            "json" => Some(MediaType::SparqlJson),
            "binary" => Some(MediaType::Binary),
            "ttl" => Some(MediaType::Turtle),
            "internal-json" => Some(MediaType::InternalJson),
            _ => None,
        };
        by_alias
            .or_else(|| MediaType::ALL.into_iter().find(|m| m.name() == lower))
            .or_else(|| MediaType::from_mime(&lower))
            .ok_or_else(|| ExportError::Config(format!("unknown media type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Construct,
    Ask,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Select => "SELECT",
            QueryKind::Construct => "CONSTRUCT",
            QueryKind::Ask => "ASK",
        })
    }
}

impl QueryKind {
    pub fn supports(&self, media_type: MediaType) -> bool {
        use MediaType::*;
        match self {
            QueryKind::Select => !matches!(media_type, Turtle),
            QueryKind::Construct => matches!(media_type, Csv | Tsv | Turtle | InternalJson),
            QueryKind::Ask => matches!(media_type, SparqlXml | SparqlJson | InternalJson),
        }
    }
}

/// The selected variables of a SELECT query, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectClause {
    variables: Vec<String>,
}

impl SelectClause {
    /// Variables may be given with `?`, `$` or no prefix; they are stored as `?name`.
    pub fn new<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let variables = variables
            .into_iter()
            .map(|v| {
                let v = v.as_ref();
                let name = v.strip_prefix(['?', '$']).unwrap_or(v);
                format!("?{}", name)
            })
            .collect();
        SelectClause { variables }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryForm {
    Select(SelectClause),
    Construct(Vec<TemplateTriple>),
    Ask,
}

impl QueryForm {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryForm::Select(_) => QueryKind::Select,
            QueryForm::Construct(_) => QueryKind::Construct,
            QueryForm::Ask => QueryKind::Ask,
        }
    }
}

/// What was asked: the query form, the requested rows and the query text.
#[derive(Debug, Clone)]
pub struct ExportQuery {
    pub form: QueryForm,
    pub window: PageWindow,
    pub text: String,
}

impl ExportQuery {
    pub fn new(form: QueryForm, window: PageWindow, text: impl Into<String>) -> Self {
        ExportQuery {
            form,
            window,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.form.kind()
    }

    /// Variables listed as `selected` in the JSON envelope.
    fn selected(&self) -> Vec<String> {
        match &self.form {
            QueryForm::Select(clause) => clause.variables().to_vec(),
            QueryForm::Construct(_) => ["?subject", "?predicate", "?object"]
                .map(String::from)
                .to_vec(),
            QueryForm::Ask => vec!["?result".to_string()],
        }
    }
}

fn framed<F: RowFormatter + 'static>(
    query: &ExportQuery,
    result: QueryResult,
    ctx: &ExecutionContext,
    formatter: F,
) -> Pieces {
    let cursor = RowCursor::new(query.window, result, ctx.variable_columns.clone());
    Box::new(FramedRows::new(cursor, formatter, ctx.cancellation.clone()))
}

/// Start exporting `result` as `media_type`.
///
/// Fails without producing any output if the query form cannot be written
/// in `media_type`, or if computing the first chunk fails. Failures after
/// that end the returned stream with a [`Chunk::Failure`].
pub fn compute_result(
    query: &ExportQuery,
    result: QueryResult,
    ctx: &ExecutionContext,
    media_type: MediaType,
    config: &ExportConfig,
) -> Result<ExportStream> {
    let kind = query.kind();
    if !kind.supports(media_type) {
        return Err(ExportError::UnsupportedFormat {
            format: media_type,
            kind,
        });
    }
    if let QueryResult::Materialized(block) = &result {
        ctx.variable_columns.check_columns(block.table.num_columns())?;
    }
    debug!(
        "exporting {} result as {} (offset {}, limit {:?}, export limit {:?})",
        kind, media_type, query.window.offset, query.window.limit, query.window.export_limit
    );
    let info = EnvelopeInfo {
        query: truncate_operation_string(&query.text, config.max_query_chars),
        selected: query.selected(),
        warnings: ctx.warnings.clone(),
        runtime_information: ctx.runtime_information.clone(),
        compute_time: ctx.compute_time,
        started: ctx.request_started,
    };
    let vocabulary = ctx.vocabulary.clone();
    let pieces: Pieces = match &query.form {
        QueryForm::Select(clause) => {
            let variables = clause.variables().to_vec();
            let columns: Vec<Option<usize>> = variables
                .iter()
                .map(|v| ctx.variable_columns.column_of(v))
                .collect();
            match media_type {
                MediaType::Csv | MediaType::Tsv => {
                    let delimiter = if media_type == MediaType::Csv {
                        Delimiter::Comma
                    } else {
                        Delimiter::Tab
                    };
                    let formatter = DelimitedRows::new(delimiter, variables, columns, vocabulary);
                    framed(query, result, ctx, formatter)
                }
                MediaType::SparqlXml => {
                    framed(query, result, ctx, XmlRows::new(&variables, columns, vocabulary))
                }
                MediaType::SparqlJson => {
                    framed(query, result, ctx, JsonRows::new(&variables, columns, vocabulary))
                }
                MediaType::Binary => framed(query, result, ctx, BinaryRows::new(&columns)),
                MediaType::InternalJson => {
                    let bindings = SelectBindings::new(columns, vocabulary);
                    framed(query, result, ctx, EnvelopeRows::new(info, bindings))
                }
                MediaType::Turtle => {
                    return Err(ExportError::UnsupportedFormat {
                        format: media_type,
                        kind,
                    });
                }
            }
        }
        QueryForm::Construct(templates) => {
            let source = TripleSource::new(
                templates.clone(),
                ctx.variable_evaluator.clone(),
                ctx.variable_columns.clone(),
                vocabulary,
                ctx.cancellation.clone(),
            );
            let syntax = match media_type {
                MediaType::Turtle => TripleSyntax::Turtle,
                MediaType::Csv => TripleSyntax::Delimited(Delimiter::Comma),
                MediaType::Tsv => TripleSyntax::Delimited(Delimiter::Tab),
                MediaType::InternalJson => {
                    let bindings = TripleBindings::new(source);
                    let formatter = EnvelopeRows::new(info, bindings);
                    return ExportStream::new(
                        framed(query, result, ctx, formatter),
                        config.min_chunk_bytes,
                    );
                }
                _ => {
                    return Err(ExportError::UnsupportedFormat {
                        format: media_type,
                        kind,
                    });
                }
            };
            framed(query, result, ctx, TripleRows::new(source, syntax))
        }
        QueryForm::Ask => {
            let cancellation = ctx.cancellation.clone();
            Box::new(std::iter::once_with(move || {
                let answer = ask::evaluate(result, &cancellation)?;
                ask::render(answer, media_type, &info).map(String::into_bytes)
            }))
        }
    };
    ExportStream::new(pieces, config.min_chunk_bytes)
}
