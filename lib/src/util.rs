use anyhow::Result;

use std::io::BufReader;
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Triple;

use log::debug;

/// RFC 4180 quoting: fields containing `"`, `,`, `\n` or `\r` are quoted
/// and embedded quotes doubled.
pub fn escape_for_csv(input: String) -> String {
    if !input.contains(['"', ',', '\n', '\r']) {
        return input;
    }
    format!("\"{}\"", input.replace('"', "\"\""))
}

/// Tabs become spaces and newlines the two characters `\n`.
pub fn escape_for_tsv(input: String) -> String {
    if !input.contains(['\t', '\n']) {
        return input;
    }
    input.replace('\t', " ").replace('\n', "\\n")
}

pub fn escape_for_xml(input: String) -> String {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return input;
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Turn the normalized representation of a literal (`"lex"`, `"lex"@en`,
/// `"lex"^^<dt>`) into valid Turtle by escaping the lexical part.
pub fn valid_rdf_literal_from_normalized(normalized: &str) -> String {
    let Some(close) = normalized.rfind('"').filter(|&i| i > 0) else {
        return normalized.to_string();
    };
    let lexical = &normalized[1..close];
    let mut out = String::with_capacity(normalized.len() + 4);
    out.push('"');
    for c in lexical.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push_str(&normalized[close..]);
    out
}

/// Cut `query` down to at most `max_chars` characters, marking the cut.
pub fn truncate_operation_string(query: &str, max_chars: usize) -> String {
    match query.char_indices().nth(max_chars) {
        None => query.to_string(),
        Some((byte_pos, _)) => format!("{}...", &query[..byte_pos]),
    }
}

/// Parse an RDF file, choosing the syntax from its extension (Turtle by default).
pub fn read_triples(file: &Path) -> Result<Vec<Triple>> {
    debug!("Reading file: {}", file.display());
    let format = file
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| match ext {
            "ttl" | "n3" => Some(RdfFormat::Turtle),
            "nt" => Some(RdfFormat::NTriples),
            "nq" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            "xml" | "rdf" => Some(RdfFormat::RdfXml),
            _ => None,
        })
        .unwrap_or(RdfFormat::Turtle);
    let reader = BufReader::new(std::fs::File::open(file)?);
    let mut triples = Vec::new();
    for quad in RdfParser::from_format(format).for_reader(reader) {
        let quad = quad?;
        triples.push(Triple::new(quad.subject, quad.predicate, quad.object));
    }
    debug!("Read {} triples from {}", triples.len(), file.display());
    Ok(triples)
}
