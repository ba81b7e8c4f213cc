use std::sync::Arc;

use serde_json::{Value, json};
use valueid::TaggedValue;

use resultexport::export::{ConstructRow, TriplePosition, VariableEvaluator};
use resultexport::local_vocab::LocalVocab;
use resultexport::term::LiteralOrIri;
use resultexport::vocabulary::InMemoryVocabulary;
use resultexport::{
    ExecutionContext, ExportConfig, ExportError, ExportQuery, IdTable, MediaType, PageWindow,
    QueryForm, QueryResult, ResultBlock, TemplateTriple, VariableToColumnMap, compute_result,
};

const TEMPLATE: &str = "?s <http://ex.org/name> ?o . ?s a <http://ex.org/Person> . _:n <http://ex.org/about> ?s";

fn term(repr: &str) -> LiteralOrIri {
    LiteralOrIri::from_string_representation(repr).expect("valid term")
}

/// alice "Alice"@en / bob 42 / carol unbound
fn fixture() -> (Arc<InMemoryVocabulary>, ResultBlock) {
    let vocab = Arc::new(InMemoryVocabulary::from_terms([
        term("<http://ex.org/alice>"),
        term("<http://ex.org/bob>"),
        term("\"Alice\"@en"),
    ]));
    let id = |repr: &str| {
        TaggedValue::from_vocab_index(vocab.index_of(&term(repr)).expect("known term"))
            .expect("index in range")
    };
    let mut local_vocab = LocalVocab::new();
    let carol = local_vocab.get_index_and_add_if_not_contained(term("<http://ex.org/carol>"));
    let rows = vec![
        [id("<http://ex.org/alice>"), id("\"Alice\"@en")],
        [id("<http://ex.org/bob>"), TaggedValue::from_int(42)],
        [
            TaggedValue::from_local_vocab_index(carol).expect("index in range"),
            TaggedValue::undefined(),
        ],
    ];
    let table = IdTable::from_rows(2, rows).expect("two columns");
    (vocab.clone(), ResultBlock::new(table, Arc::new(local_vocab)))
}

fn context(vocab: Arc<InMemoryVocabulary>) -> ExecutionContext {
    let columns: VariableToColumnMap = [("?s", 0), ("?o", 1)].into_iter().collect();
    ExecutionContext::new(vocab, columns)
}

fn construct_query(template: &str) -> ExportQuery {
    let templates = TemplateTriple::parse_all(template).expect("valid template");
    ExportQuery::new(
        QueryForm::Construct(templates),
        PageWindow::unbounded(),
        format!("CONSTRUCT {{ {} }} WHERE {{ ... }}", template),
    )
}

fn run(
    query: &ExportQuery,
    ctx: &ExecutionContext,
    block: ResultBlock,
    media_type: MediaType,
) -> String {
    let stream = compute_result(
        query,
        QueryResult::materialized(block),
        ctx,
        media_type,
        &ExportConfig::default(),
    )
    .expect("export starts");
    let mut out = Vec::new();
    stream.write_to(&mut out).expect("write output");
    String::from_utf8(out).expect("utf-8 output")
}

#[test]
fn test_construct_turtle_drops_unbound_triples() {
    let (vocab, block) = fixture();
    let out = run(&construct_query(TEMPLATE), &context(vocab), block, MediaType::Turtle);
    let rdf_type = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>";
    let expected = [
        "<http://ex.org/alice> <http://ex.org/name> \"Alice\"@en .".to_string(),
        format!("<http://ex.org/alice> {} <http://ex.org/Person> .", rdf_type),
        "_:u0_n <http://ex.org/about> <http://ex.org/alice> .".to_string(),
        "<http://ex.org/bob> <http://ex.org/name> 42 .".to_string(),
        format!("<http://ex.org/bob> {} <http://ex.org/Person> .", rdf_type),
        "_:u1_n <http://ex.org/about> <http://ex.org/bob> .".to_string(),
        format!("<http://ex.org/carol> {} <http://ex.org/Person> .", rdf_type),
        "_:u2_n <http://ex.org/about> <http://ex.org/carol> .".to_string(),
    ];
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_construct_literals_only_in_object_position() {
    let (vocab, block) = fixture();
    let query =
        construct_query("\"x\" <http://ex.org/p> ?s . ?s <http://ex.org/label> \"tab\\there\"");
    let out = run(&query, &context(vocab), block, MediaType::Turtle);
    assert_eq!(out.lines().count(), 3);
    assert!(out.starts_with("<http://ex.org/alice> <http://ex.org/label> \"tab\there\" .\n"));
}

#[test]
fn test_construct_tsv() {
    let (vocab, block) = fixture();
    let query = construct_query("?s <http://ex.org/name> ?o");
    let out = run(&query, &context(vocab), block, MediaType::Tsv);
    assert_eq!(
        out,
        "<http://ex.org/alice>\t<http://ex.org/name>\t\"Alice\"@en\n<http://ex.org/bob>\t<http://ex.org/name>\t42\n"
    );
}

#[test]
fn test_construct_internal_json_overestimates_total() {
    let (vocab, block) = fixture();
    let out = run(&construct_query(TEMPLATE), &context(vocab), block, MediaType::InternalJson);
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(parsed["selected"], json!(["?subject", "?predicate", "?object"]));
    assert_eq!(parsed["resultSizeExported"], 8);
    assert_eq!(parsed["resultSizeTotal"], 9);
    assert_eq!(
        parsed["res"][0],
        json!(["<http://ex.org/alice>", "<http://ex.org/name>", "\"Alice\"@en"])
    );
}

#[test]
fn test_construct_rejects_sparql_formats() {
    let (vocab, block) = fixture();
    for media_type in [MediaType::SparqlXml, MediaType::SparqlJson, MediaType::Binary] {
        let result = compute_result(
            &construct_query(TEMPLATE),
            QueryResult::materialized(block.clone()),
            &context(vocab.clone()),
            media_type,
            &ExportConfig::default(),
        );
        assert!(matches!(result, Err(ExportError::UnsupportedFormat { .. })));
    }
}

struct Shouting;

impl VariableEvaluator for Shouting {
    fn evaluate(
        &self,
        variable: &str,
        row: &ConstructRow<'_>,
        position: TriplePosition,
    ) -> resultexport::Result<Option<String>> {
        if position != TriplePosition::Object {
            return Ok(Some(format!("<http://ex.org/row{}>", row.row_index)));
        }
        Ok(Some(format!("\"{}\"", variable.to_uppercase())))
    }
}

#[test]
fn test_construct_uses_injected_evaluator() {
    let (vocab, block) = fixture();
    let ctx = context(vocab).with_variable_evaluator(Arc::new(Shouting));
    let out = run(&construct_query("?s <http://ex.org/p> ?o"), &ctx, block, MediaType::Turtle);
    assert_eq!(
        out,
        "<http://ex.org/row0> <http://ex.org/p> \"?O\" .\n\
         <http://ex.org/row1> <http://ex.org/p> \"?O\" .\n\
         <http://ex.org/row2> <http://ex.org/p> \"?O\" .\n"
    );
}

#[test]
fn test_construct_cancellation_before_first_triple() {
    let (vocab, block) = fixture();
    let ctx = context(vocab);
    ctx.cancellation.cancel();
    let result = compute_result(
        &construct_query(TEMPLATE),
        QueryResult::materialized(block),
        &ctx,
        MediaType::Turtle,
        &ExportConfig::default(),
    );
    match result {
        Err(e) => assert!(e.is_cancellation(), "unexpected error {}", e),
        Ok(_) => panic!("cancelled export must not start"),
    }
}

fn ask(blocks: Vec<resultexport::Result<Arc<ResultBlock>>>, media_type: MediaType) -> String {
    let (vocab, _) = fixture();
    let query = ExportQuery::new(QueryForm::Ask, PageWindow::unbounded(), "ASK { ?s ?p ?o }");
    let stream = compute_result(
        &query,
        QueryResult::lazy(blocks),
        &context(vocab),
        media_type,
        &ExportConfig::default(),
    )
    .expect("export starts");
    let mut out = Vec::new();
    stream.write_to(&mut out).expect("write output");
    String::from_utf8(out).expect("utf-8 output")
}

fn empty_block() -> Arc<ResultBlock> {
    Arc::new(ResultBlock::new(IdTable::new(2), Arc::new(LocalVocab::new())))
}

#[test]
fn test_ask_short_circuits() {
    let (_, block) = fixture();
    let blocks = vec![
        Ok(empty_block()),
        Ok(Arc::new(block)),
        Err(ExportError::Execution("never pulled".to_string())),
    ];
    let out = ask(blocks, MediaType::SparqlXml);
    assert_eq!(
        out,
        "<?xml version=\"1.0\"?>\n<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">\n  <head/>\n  <boolean>true</boolean>\n</sparql>"
    );
}

#[test]
fn test_ask_json_false() {
    let out = ask(vec![Ok(empty_block())], MediaType::SparqlJson);
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(parsed, json!({"head": {}, "boolean": false}));
}

#[test]
fn test_ask_internal_json() {
    let (_, block) = fixture();
    let out = ask(vec![Ok(Arc::new(block))], MediaType::InternalJson);
    let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(parsed["selected"], json!(["?result"]));
    assert_eq!(
        parsed["res"],
        json!([["\"true\"^^<http://www.w3.org/2001/XMLSchema#boolean>"]])
    );
    assert_eq!(parsed["resultSizeExported"], 1);
    assert_eq!(parsed["resultSizeTotal"], 1);
}

#[test]
fn test_ask_rejects_tabular_formats() {
    let (vocab, _) = fixture();
    let query = ExportQuery::new(QueryForm::Ask, PageWindow::unbounded(), "ASK {}");
    for media_type in [MediaType::Csv, MediaType::Tsv, MediaType::Binary, MediaType::Turtle] {
        let result = compute_result(
            &query,
            QueryResult::lazy(Vec::new()),
            &context(vocab.clone()),
            media_type,
            &ExportConfig::default(),
        );
        assert!(matches!(result, Err(ExportError::UnsupportedFormat { .. })));
    }
}
