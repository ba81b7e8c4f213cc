//! IRIs and fixed strings used while decoding and exporting results.

use oxigraph::model::NamedNodeRef;

// xsd
pub const XSD_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#string");
pub const XSD_BOOLEAN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#boolean");
pub const XSD_INTEGER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");
pub const XSD_INT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#int");
pub const XSD_LONG: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#long");
pub const XSD_DECIMAL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#decimal");
pub const XSD_DOUBLE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#double");
pub const XSD_FLOAT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#float");
// geosparql
pub const GEO_WKT_LITERAL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#wktLiteral");

/// IRIs starting with this prefix stand for blank nodes and are exported as `_:label`.
pub const BLANK_NODE_IRI_PREFIX: &str = "urn:x-blank-node:";

pub const SPARQL_RESULTS_NS: &str = "http://www.w3.org/2005/sparql-results#";

/// Text appended to a partially delivered result when exporting fails mid-stream.
pub const ERROR_FOOTER_PREFIX: &str = "\n !!!!>># An error has occurred while exporting the query result. Unfortunately due to limitations in the HTTP 1.1 protocol, there is no better way to report this than to append it to the incomplete result. The error message was:\n";

pub const DEFAULT_MIN_CHUNK_BYTES: usize = 1 << 16;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 5000;
pub const DEFAULT_BLANK_NODE_BLOCK_SIZE: u64 = 1000;
pub const DEFAULT_BLOCK_ROWS: usize = 100_000;
