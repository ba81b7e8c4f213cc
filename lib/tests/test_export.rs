use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use valueid::TaggedValue;

use resultexport::local_vocab::LocalVocab;
use resultexport::term::LiteralOrIri;
use resultexport::vocabulary::InMemoryVocabulary;
use resultexport::{
    CancellationHandle, Chunk, ExecutionContext, ExportConfig, ExportError, ExportQuery,
    IdTable, MediaType, PageWindow, QueryForm, QueryResult, ResultBlock, SelectClause, StreamEnd,
    VariableToColumnMap, compute_result,
};

const ALICE: &str = "<http://ex.org/alice>";
const BOB: &str = "<http://ex.org/bob>";
const ALICE_NAME: &str = "\"Alice\"@en";

fn term(repr: &str) -> LiteralOrIri {
    LiteralOrIri::from_string_representation(repr).expect("valid term")
}

fn vocabulary() -> Arc<InMemoryVocabulary> {
    Arc::new(InMemoryVocabulary::from_terms(
        [ALICE, BOB, ALICE_NAME, "\"a,b\""].map(term),
    ))
}

fn vocab_value(vocab: &InMemoryVocabulary, repr: &str) -> TaggedValue {
    let index = vocab.index_of(&term(repr)).expect("term in vocabulary");
    TaggedValue::from_vocab_index(index).expect("index in range")
}

/// Three rows over `?s ?o`:
/// alice "Alice"@en / bob 42 / carol (local vocab) unbound.
fn people_block(vocab: &InMemoryVocabulary) -> ResultBlock {
    let mut local_vocab = LocalVocab::new();
    let carol = local_vocab.get_index_and_add_if_not_contained(term("<http://ex.org/carol>"));
    let rows = vec![
        [vocab_value(vocab, ALICE), vocab_value(vocab, ALICE_NAME)],
        [vocab_value(vocab, BOB), TaggedValue::from_int(42)],
        [
            TaggedValue::from_local_vocab_index(carol).expect("index in range"),
            TaggedValue::undefined(),
        ],
    ];
    let table = IdTable::from_rows(2, rows).expect("two columns");
    ResultBlock::new(table, Arc::new(local_vocab))
}

fn context(vocab: Arc<InMemoryVocabulary>) -> ExecutionContext {
    let columns: VariableToColumnMap = [("?s", 0), ("?o", 1)].into_iter().collect();
    ExecutionContext::new(vocab, columns)
}

fn select(vars: &[&str], window: PageWindow) -> ExportQuery {
    ExportQuery::new(
        QueryForm::Select(SelectClause::new(vars.iter().copied())),
        window,
        "SELECT ?s ?o WHERE { ?s <http://ex.org/name> ?o }",
    )
}

fn export(query: &ExportQuery, media_type: MediaType) -> Vec<u8> {
    let vocab = vocabulary();
    let block = people_block(&vocab);
    let ctx = context(vocab);
    let stream = compute_result(
        query,
        QueryResult::materialized(block),
        &ctx,
        media_type,
        &ExportConfig::default(),
    )
    .expect("export starts");
    let mut out = Vec::new();
    let end = stream.write_to(&mut out).expect("write output");
    assert_eq!(end, StreamEnd::Complete { bytes: out.len() });
    out
}

fn export_text(query: &ExportQuery, media_type: MediaType) -> String {
    String::from_utf8(export(query, media_type)).expect("utf-8 output")
}

#[test]
fn test_select_csv() {
    let out = export_text(&select(&["?s", "?o"], PageWindow::unbounded()), MediaType::Csv);
    assert_eq!(
        out,
        "s,o\nhttp://ex.org/alice,Alice\nhttp://ex.org/bob,42\nhttp://ex.org/carol,\n"
    );
}

#[test]
fn test_select_tsv() {
    let out = export_text(&select(&["?s", "?o"], PageWindow::unbounded()), MediaType::Tsv);
    assert_eq!(
        out,
        "?s\t?o\n<http://ex.org/alice>\t\"Alice\"@en\n<http://ex.org/bob>\t42\n<http://ex.org/carol>\t\n"
    );
}

#[test]
fn test_select_unknown_variable_is_empty() {
    let out = export_text(
        &select(&["?s", "?nothing"], PageWindow::new(0, Some(1), None)),
        MediaType::Csv,
    );
    assert_eq!(out, "s,nothing\nhttp://ex.org/alice,\n");
}

#[test]
fn test_select_sparql_xml() {
    let out = export_text(
        &select(&["?s", "?o"], PageWindow::new(0, Some(2), None)),
        MediaType::SparqlXml,
    );
    let expected = [
        "<?xml version=\"1.0\"?>",
        "<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">",
        "<head>",
        "  <variable name=\"s\"/>",
        "  <variable name=\"o\"/>",
        "</head>",
        "<results>",
        "  <result>",
        "    <binding name=\"s\"><uri>http://ex.org/alice</uri></binding>",
        "    <binding name=\"o\"><literal xml:lang=\"en\">Alice</literal></binding>",
        "  </result>",
        "  <result>",
        "    <binding name=\"s\"><uri>http://ex.org/bob</uri></binding>",
        "    <binding name=\"o\"><literal datatype=\"http://www.w3.org/2001/XMLSchema#int\">42</literal></binding>",
        "  </result>",
        "</results>",
        "</sparql>",
    ]
    .join("\n");
    assert_eq!(out, expected);
}

#[test]
fn test_select_sparql_json() {
    let out = export_text(&select(&["?s", "?o"], PageWindow::unbounded()), MediaType::SparqlJson);
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(
        parsed,
        json!({
            "head": {"vars": ["s", "o"]},
            "results": {"bindings": [
                {
                    "s": {"type": "uri", "value": "http://ex.org/alice"},
                    "o": {"type": "literal", "value": "Alice", "xml:lang": "en"}
                },
                {
                    "s": {"type": "uri", "value": "http://ex.org/bob"},
                    "o": {
                        "type": "literal",
                        "value": "42",
                        "datatype": "http://www.w3.org/2001/XMLSchema#int"
                    }
                },
                {
                    "s": {"type": "uri", "value": "http://ex.org/carol"}
                }
            ]}
        })
    );
}

#[test]
fn test_select_json_row_without_bindings() {
    let out = export_text(
        &select(&["?nothing"], PageWindow::new(0, Some(2), None)),
        MediaType::SparqlJson,
    );
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(parsed["results"]["bindings"], json!([{}, {}]));
}

#[test]
fn test_select_binary() {
    let vocab = vocabulary();
    let block = people_block(&vocab);
    let out = export(
        &select(&["?o", "?missing", "?s"], PageWindow::unbounded()),
        MediaType::Binary,
    );
    assert_eq!(out.len(), 3 * 2 * 8);
    assert_eq!(&out[..8], &block.table.get(0, 1).to_bytes());
    assert_eq!(&out[8..16], &block.table.get(0, 0).to_bytes());
    let undefined = TaggedValue::from_bytes(&out[32..40]).expect("valid word");
    assert!(undefined.is_undefined());
}

#[test]
fn test_select_internal_json_counts() {
    let out = export_text(
        &select(&["?s", "?o"], PageWindow::new(1, Some(2), Some(1))),
        MediaType::InternalJson,
    );
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(parsed["status"], "OK");
    assert_eq!(parsed["selected"], json!(["?s", "?o"]));
    assert_eq!(
        parsed["res"],
        json!([[BOB, "\"42\"^^<http://www.w3.org/2001/XMLSchema#int>"]])
    );
    assert_eq!(parsed["resultSizeExported"], 1);
    assert_eq!(parsed["resultSizeTotal"], 2);
    assert_eq!(parsed["resultsize"], 2);
    assert_eq!(parsed["query"], "SELECT ?s ?o WHERE { ?s <http://ex.org/name> ?o }");
}

#[test]
fn test_internal_json_total_time_starts_at_request() {
    let vocab = vocabulary();
    let block = people_block(&vocab);
    let arrived = Instant::now()
        .checked_sub(Duration::from_millis(1500))
        .expect("clock far enough from its origin");
    let ctx = context(vocab).with_request_started(arrived);
    let stream = compute_result(
        &select(&["?s"], PageWindow::unbounded()),
        QueryResult::materialized(block),
        &ctx,
        MediaType::InternalJson,
        &ExportConfig::default(),
    )
    .expect("export starts");
    let mut out = Vec::new();
    stream.write_to(&mut out).expect("write output");
    let parsed: Value = serde_json::from_slice(&out).expect("valid JSON");
    let total = parsed["time"]["total"].as_str().expect("total time");
    let ms: u64 = total.trim_end_matches("ms").parse().expect("milliseconds");
    assert!(ms >= 1500, "total time {} ignores the request start", total);
}

#[test]
fn test_internal_json_null_for_unbound() {
    let out = export_text(
        &select(&["?s", "?o"], PageWindow::new(2, None, None)),
        MediaType::InternalJson,
    );
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(parsed["res"], json!([["<http://ex.org/carol>", null]]));
}

#[test]
fn test_query_text_is_truncated() {
    let vocab = vocabulary();
    let block = people_block(&vocab);
    let ctx = context(vocab);
    let config = ExportConfig::builder()
        .max_query_chars(6)
        .build()
        .expect("valid config");
    let stream = compute_result(
        &select(&["?s"], PageWindow::unbounded()),
        QueryResult::materialized(block),
        &ctx,
        MediaType::InternalJson,
        &config,
    )
    .expect("export starts");
    let mut out = Vec::new();
    stream.write_to(&mut out).expect("write output");
    let parsed: Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(parsed["query"], "SELECT...");
}

#[test]
fn test_unsupported_format_fails_before_pulling_blocks() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let vocab = vocabulary();
    let block = Arc::new(people_block(&vocab));
    let blocks = (0..3).map(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(block.clone())
    });
    let result = compute_result(
        &select(&["?s"], PageWindow::unbounded()),
        QueryResult::lazy(blocks),
        &context(vocab),
        MediaType::Turtle,
        &ExportConfig::default(),
    );
    match result {
        Err(ExportError::UnsupportedFormat { format, .. }) => assert_eq!(format, MediaType::Turtle),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("turtle export of a SELECT result must fail"),
    }
    assert_eq!(pulled.load(Ordering::SeqCst), 0);
}

#[test]
fn test_error_before_output_is_returned() {
    let vocab = vocabulary();
    let blocks = vec![Err(ExportError::Execution("index scan failed".to_string()))];
    let result = compute_result(
        &select(&["?s"], PageWindow::unbounded()),
        QueryResult::lazy(blocks),
        &context(vocab),
        MediaType::Csv,
        &ExportConfig::default(),
    );
    assert!(matches!(result, Err(ExportError::Execution(_))));
}

#[test]
fn test_column_map_past_the_table_is_an_error() {
    let vocab = vocabulary();
    let columns: VariableToColumnMap = [("?s", 0), ("?o", 5)].into_iter().collect();
    for media_type in [MediaType::Csv, MediaType::SparqlJson, MediaType::Binary] {
        let materialized = QueryResult::materialized(people_block(&vocab));
        let lazy = QueryResult::lazy(vec![Ok(Arc::new(people_block(&vocab)))]);
        for result in [materialized, lazy] {
            let ctx = ExecutionContext::new(vocab.clone(), columns.clone());
            let outcome = compute_result(
                &select(&["?s", "?o"], PageWindow::unbounded()),
                result,
                &ctx,
                media_type,
                &ExportConfig::default(),
            );
            match outcome {
                Err(ExportError::Execution(m)) => assert!(m.contains("?o"), "{}", m),
                Err(e) => panic!("unexpected error {}", e),
                Ok(_) => panic!("{} export with a dangling column must fail", media_type),
            }
        }
    }
}

#[test]
fn test_error_after_output_becomes_footer() {
    let vocab = vocabulary();
    let block = Arc::new(people_block(&vocab));
    let blocks = vec![
        Ok(block),
        Err(ExportError::Execution("index scan failed".to_string())),
    ];
    let config = ExportConfig::builder()
        .min_chunk_bytes(1)
        .build()
        .expect("valid config");
    let stream = compute_result(
        &select(&["?s"], PageWindow::unbounded()),
        QueryResult::lazy(blocks),
        &context(vocab),
        MediaType::Tsv,
        &config,
    )
    .expect("header is produced");
    let chunks: Vec<Chunk> = stream.collect();
    let (last, data) = chunks.split_last().expect("at least one chunk");
    assert!(data.iter().all(|c| matches!(c, Chunk::Data(_))));
    match last {
        Chunk::Failure { cancelled, footer } => {
            assert!(!cancelled);
            assert!(footer.contains("An error has occurred while exporting the query result"));
            assert!(footer.ends_with("Query execution failed: index scan failed"));
        }
        Chunk::Data(_) => panic!("stream must end with a failure"),
    }
    let text: String = data
        .iter()
        .filter_map(|c| match c {
            Chunk::Data(d) => Some(String::from_utf8_lossy(d).into_owned()),
            Chunk::Failure { .. } => None,
        })
        .collect();
    assert_eq!(
        text,
        "?s\n<http://ex.org/alice>\n<http://ex.org/bob>\n<http://ex.org/carol>\n"
    );
}

#[test]
fn test_cancellation_stops_export() {
    let vocab = vocabulary();
    let block = people_block(&vocab);
    let cancellation = CancellationHandle::new();
    let ctx = context(vocab).with_cancellation(cancellation.clone());
    let config = ExportConfig::builder()
        .min_chunk_bytes(1)
        .build()
        .expect("valid config");
    let stream = compute_result(
        &select(&["?s", "?o"], PageWindow::unbounded()),
        QueryResult::materialized(block),
        &ctx,
        MediaType::Csv,
        &config,
    )
    .expect("header is produced");
    cancellation.cancel();
    let mut out = Vec::new();
    let end = stream.write_to(&mut out).expect("write output");
    assert!(matches!(end, StreamEnd::Failed { cancelled: true, .. }));
    let text = String::from_utf8(out).expect("utf-8 output");
    assert!(text.starts_with("s,o\n"));
    assert!(text.contains("Query was cancelled"));
}

#[test]
fn test_lazy_blocks_are_paged_across_boundaries() {
    let vocab = vocabulary();
    let blocks: Vec<_> = (0..3).map(|_| Ok(Arc::new(people_block(&vocab)))).collect();
    let stream = compute_result(
        &select(&["?o"], PageWindow::new(1, Some(4), None)),
        QueryResult::lazy(blocks),
        &context(vocab),
        MediaType::Tsv,
        &ExportConfig::default(),
    )
    .expect("export starts");
    let mut out = Vec::new();
    stream.write_to(&mut out).expect("write output");
    assert_eq!(
        String::from_utf8(out).expect("utf-8 output"),
        "?o\n42\n\n\"Alice\"@en\n42\n"
    );
}
