//! CONSTRUCT templates and their instantiation against result rows.

use std::fmt;
use std::sync::Arc;

use oxigraph::model::vocab::{rdf, xsd};
use oxigraph::model::{Literal, NamedNode};
use serde_json::{Value, json};
use valueid::xsd::{XSD_BOOLEAN, XSD_DECIMAL, XSD_INT};

use crate::cancellation::CancellationHandle;
use crate::decode::{DecodeOptions, id_to_string_and_type, identity};
use crate::errors::{ExportError, Result};
use crate::export::delimited::Delimiter;
use crate::export::envelope::JsonBindings;
use crate::export::rows::RowFormatter;
use crate::result::{ResultBlock, VariableToColumnMap};
use crate::term::LiteralOrIri;
use crate::util::valid_rdf_literal_from_normalized;
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTerm {
    /// Variable name including the leading `?`.
    Variable(String),
    Iri(NamedNode),
    Literal(Literal),
    /// Blank node label without `_:`.
    BlankNode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTriple {
    pub subject: TemplateTerm,
    pub predicate: TemplateTerm,
    pub object: TemplateTerm,
}

impl fmt::Display for TemplateTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TemplateTerm::Variable(v) => f.write_str(v),
            TemplateTerm::Iri(iri) => write!(f, "{}", iri),
            TemplateTerm::Literal(lit) => write!(f, "{}", lit),
            TemplateTerm::BlankNode(label) => write!(f, "_:{}", label),
        }
    }
}

impl TemplateTriple {
    pub fn new(subject: TemplateTerm, predicate: TemplateTerm, object: TemplateTerm) -> Self {
        TemplateTriple {
            subject,
            predicate,
            object,
        }
    }

    fn terms(&self) -> [(&TemplateTerm, TriplePosition); 3] {
        [
            (&self.subject, TriplePosition::Subject),
            (&self.predicate, TriplePosition::Predicate),
            (&self.object, TriplePosition::Object),
        ]
    }

    /// Parse a template body such as `?s <http://p> ?o . ?s a <http://C>`.
    ///
    /// Terms are variables, `<iri>`, `_:label`, quoted literals with an
    /// optional `@lang` or `^^<datatype>`, bare numbers and booleans, and
    /// `a` for `rdf:type`. Triples are separated by `.`.
    pub fn parse_all(text: &str) -> Result<Vec<TemplateTriple>> {
        let mut triples = Vec::new();
        let mut terms = Vec::with_capacity(3);
        for token in tokenize(text)? {
            if token == "." {
                if !terms.is_empty() {
                    return Err(template_error(text, "incomplete triple before '.'"));
                }
                continue;
            }
            terms.push(parse_term(&token).map_err(|m| template_error(text, &m))?);
            if terms.len() == 3 {
                let object = terms.pop();
                let predicate = terms.pop();
                let subject = terms.pop();
                if let (Some(s), Some(p), Some(o)) = (subject, predicate, object) {
                    triples.push(TemplateTriple::new(s, p, o));
                }
            }
        }
        if !terms.is_empty() {
            return Err(template_error(text, "incomplete triple at end of template"));
        }
        Ok(triples)
    }
}

fn template_error(text: &str, message: &str) -> ExportError {
    ExportError::Config(format!("invalid CONSTRUCT template `{}`: {}", text, message))
}

fn tokenize(text: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        match c {
            '<' => {
                while i < chars.len() && chars[i] != '>' {
                    i += 1;
                }
                if i == chars.len() {
                    return Err(template_error(text, "unterminated IRI"));
                }
                i += 1;
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(template_error(text, "unterminated literal"));
                }
                i += 1;
                if i < chars.len() && chars[i] == '@' {
                    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '.' {
                        i += 1;
                    }
                } else if chars[i..].starts_with(&['^', '^', '<']) {
                    while i < chars.len() && chars[i] != '>' {
                        i += 1;
                    }
                    if i == chars.len() {
                        return Err(template_error(text, "unterminated datatype"));
                    }
                    i += 1;
                }
            }
            _ => {
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                // A '.' glued to the end of a word ends the triple, unless the word is a number.
                let word: String = chars[start..i].iter().collect();
                if word.len() > 1 && word.ends_with('.') && word.parse::<f64>().is_err() {
                    tokens.push(word[..word.len() - 1].to_string());
                    tokens.push(".".to_string());
                    continue;
                }
            }
        }
        tokens.push(chars[start..i].iter().collect());
    }
    Ok(tokens)
}

fn unescape(lexical: &str) -> String {
    let mut out = String::with_capacity(lexical.len());
    let mut chars = lexical.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn parse_term(token: &str) -> std::result::Result<TemplateTerm, String> {
    if let Some(name) = token.strip_prefix('?').or_else(|| token.strip_prefix('$')) {
        if name.is_empty() {
            return Err("empty variable name".to_string());
        }
        return Ok(TemplateTerm::Variable(format!("?{}", name)));
    }
    if let Some(iri) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return NamedNode::new(iri)
            .map(TemplateTerm::Iri)
            .map_err(|e| format!("invalid IRI {}: {}", iri, e));
    }
    if let Some(label) = token.strip_prefix("_:") {
        return Ok(TemplateTerm::BlankNode(label.to_string()));
    }
    if token.starts_with('"') {
        let close = token.rfind('"').filter(|&i| i > 0).ok_or("bad literal")?;
        let value = unescape(&token[1..close]);
        let suffix = &token[close + 1..];
        let literal = if suffix.is_empty() {
            Literal::new_simple_literal(value)
        } else if let Some(lang) = suffix.strip_prefix('@') {
            Literal::new_language_tagged_literal(value, lang)
                .map_err(|e| format!("invalid language tag {}: {}", lang, e))?
        } else if let Some(dt) = suffix.strip_prefix("^^<").and_then(|s| s.strip_suffix('>')) {
            let dt = NamedNode::new(dt).map_err(|e| format!("invalid datatype {}: {}", dt, e))?;
            Literal::new_typed_literal(value, dt)
        } else {
            return Err(format!("unexpected literal suffix {}", suffix));
        };
        return Ok(TemplateTerm::Literal(literal));
    }
    match token {
        "a" => return Ok(TemplateTerm::Iri(rdf::TYPE.into_owned())),
        "true" | "false" => {
            return Ok(TemplateTerm::Literal(Literal::new_typed_literal(
                token,
                xsd::BOOLEAN,
            )));
        }
        _ => {}
    }
    if token.parse::<i64>().is_ok() {
        return Ok(TemplateTerm::Literal(Literal::new_typed_literal(
            token,
            xsd::INTEGER,
        )));
    }
    if token.parse::<f64>().is_ok() {
        let datatype = if token.contains(['e', 'E']) {
            xsd::DOUBLE
        } else {
            xsd::DECIMAL
        };
        return Ok(TemplateTerm::Literal(Literal::new_typed_literal(token, datatype)));
    }
    Err(format!("unrecognized term {}", token))
}

/// The row a template is instantiated against.
pub struct ConstructRow<'a> {
    pub block: &'a ResultBlock,
    pub row: usize,
    /// Position of the row among all exported rows.
    pub row_index: u64,
    pub variable_columns: &'a VariableToColumnMap,
    pub vocabulary: &'a dyn Vocabulary,
}

/// Turns the value a row binds to a template variable into term text.
pub trait VariableEvaluator: Send + Sync {
    /// `None` drops the triple.
    fn evaluate(
        &self,
        variable: &str,
        row: &ConstructRow<'_>,
        position: TriplePosition,
    ) -> Result<Option<String>>;
}

/// Decodes the bound value. Inline values keep their bare text when it
/// reads unambiguously in Turtle; other typed values are written as
/// `"text"^^<type>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodingEvaluator;

impl VariableEvaluator for DecodingEvaluator {
    fn evaluate(
        &self,
        variable: &str,
        row: &ConstructRow<'_>,
        _position: TriplePosition,
    ) -> Result<Option<String>> {
        let Some(column) = row.variable_columns.column_of(variable) else {
            return Ok(None);
        };
        let decoded = id_to_string_and_type(
            row.vocabulary,
            row.block.table.get(row.row, column),
            &row.block.local_vocab,
            DecodeOptions::default(),
            identity,
        )?;
        Ok(decoded.map(|(text, datatype)| match datatype {
            None => text,
            Some(t) if t == XSD_INT || t == XSD_DECIMAL => text,
            Some(t) if t == XSD_BOOLEAN && text.len() > 1 => text,
            Some(t) => format!("\"{}\"^^<{}>", text, t),
        }))
    }
}

/// Instantiates every template for every exported row.
pub(crate) struct TripleSource {
    templates: Vec<TemplateTriple>,
    evaluator: Arc<dyn VariableEvaluator>,
    variable_columns: VariableToColumnMap,
    vocabulary: Arc<dyn Vocabulary>,
    cancellation: CancellationHandle,
    row_index: u64,
}

impl TripleSource {
    pub(crate) fn new(
        templates: Vec<TemplateTriple>,
        evaluator: Arc<dyn VariableEvaluator>,
        variable_columns: VariableToColumnMap,
        vocabulary: Arc<dyn Vocabulary>,
        cancellation: CancellationHandle,
    ) -> Self {
        TripleSource {
            templates,
            evaluator,
            variable_columns,
            vocabulary,
            cancellation,
            row_index: 0,
        }
    }

    fn num_templates(&self) -> u64 {
        self.templates.len() as u64
    }

    /// Resolved triples of one row; triples with an unresolved position are left out.
    pub(crate) fn triples(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<[String; 3]>> {
        let context = ConstructRow {
            block,
            row,
            row_index: self.row_index,
            variable_columns: &self.variable_columns,
            vocabulary: self.vocabulary.as_ref(),
        };
        self.row_index += 1;
        let mut triples = Vec::with_capacity(self.templates.len());
        for template in &self.templates {
            let mut resolved: [String; 3] = Default::default();
            let mut complete = true;
            for (slot, (term, position)) in resolved.iter_mut().zip(template.terms()) {
                match evaluate_term(term, position, &context, self.evaluator.as_ref())? {
                    Some(text) => *slot = text,
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                triples.push(resolved);
                self.cancellation.check("exporting CONSTRUCT triples")?;
            }
        }
        Ok(triples)
    }
}

fn evaluate_term(
    term: &TemplateTerm,
    position: TriplePosition,
    row: &ConstructRow<'_>,
    evaluator: &dyn VariableEvaluator,
) -> Result<Option<String>> {
    match term {
        TemplateTerm::Variable(v) => evaluator.evaluate(v, row, position),
        TemplateTerm::Iri(iri) => Ok(Some(format!("<{}>", iri.as_str()))),
        TemplateTerm::Literal(lit) => Ok((position == TriplePosition::Object)
            .then(|| LiteralOrIri::Literal(lit.clone()).to_string_representation())),
        TemplateTerm::BlankNode(label) => Ok(Some(format!("_:u{}_{}", row.row_index, label))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TripleSyntax {
    Turtle,
    Delimited(Delimiter),
}

impl TripleSyntax {
    fn write(self, [s, p, o]: [String; 3], out: &mut String) {
        match self {
            TripleSyntax::Turtle => {
                let object = if o.starts_with('"') {
                    valid_rdf_literal_from_normalized(&o)
                } else {
                    o
                };
                out.push_str(&format!("{} {} {} .\n", s, p, object));
            }
            TripleSyntax::Delimited(d) => {
                let sep = d.separator();
                out.push_str(&format!(
                    "{}{}{}{}{}\n",
                    d.escape(s),
                    sep,
                    d.escape(p),
                    sep,
                    d.escape(o)
                ));
            }
        }
    }
}

/// CONSTRUCT results as Turtle, CSV or TSV lines.
pub(crate) struct TripleRows {
    source: TripleSource,
    syntax: TripleSyntax,
}

impl TripleRows {
    pub(crate) fn new(source: TripleSource, syntax: TripleSyntax) -> Self {
        TripleRows { source, syntax }
    }
}

impl RowFormatter for TripleRows {
    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>> {
        let mut out = String::new();
        for triple in self.source.triples(block, row)? {
            self.syntax.write(triple, &mut out);
        }
        Ok(out.into_bytes())
    }

    fn checks_cancellation(&self) -> bool {
        true
    }
}

/// CONSTRUCT results as `[s, p, o]` arrays inside the JSON envelope.
pub(crate) struct TripleBindings {
    source: TripleSource,
}

impl TripleBindings {
    pub(crate) fn new(source: TripleSource) -> Self {
        TripleBindings { source }
    }
}

impl JsonBindings for TripleBindings {
    fn bindings(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<Value>> {
        Ok(self
            .source
            .triples(block, row)?
            .into_iter()
            .map(|[s, p, o]| json!([s, p, o]))
            .collect())
    }

    /// Dropped triples are not subtracted.
    fn total(&self, counted_rows: u64) -> u64 {
        counted_rows.saturating_mul(self.source.num_templates())
    }

    fn checks_cancellation(&self) -> bool {
        true
    }
}
