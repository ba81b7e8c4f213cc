//! Paginated, streaming export of encoded query results.
//!
//! A query result arrives as blocks of [`TaggedValue`](valueid::TaggedValue)
//! rows ([`result::QueryResult`]). [`export::compute_result`] selects the
//! requested rows with the [`pager`], decodes the values against the
//! [`vocabulary`] and the result's [`local_vocab`], and streams them in one
//! of the [`export::MediaType`] formats. The [`blank_nodes`] module hands
//! out ranges of blank node ids to concurrent query scopes.

extern crate derive_builder;

pub mod blank_nodes;
pub mod cancellation;
pub mod config;
pub mod consts;
pub mod context;
pub mod decode;
pub mod encode;
pub mod errors;
pub mod export;
pub mod local_vocab;
pub mod pager;
pub mod result;
pub mod term;
pub mod util;
pub mod vocabulary;

pub use blank_nodes::{BlankNodeManager, IdBlock, LocalBlankNodeManager};
pub use cancellation::CancellationHandle;
pub use config::ExportConfig;
pub use context::ExecutionContext;
pub use errors::{ExportError, Result};
pub use export::{
    Chunk, ExportQuery, ExportStream, MediaType, QueryForm, QueryKind, SelectClause, StreamEnd,
    TemplateTriple, compute_result,
};
pub use pager::{PageWindow, paginate};
pub use result::{IdTable, QueryResult, ResultBlock, VariableToColumnMap};

/// Initializes logging for the export library.
///
/// If `REXPORT_LOG` is set, `RUST_LOG` is set to its value, so it takes
/// precedence over `RUST_LOG`. The logger itself (e.g. `env_logger::init()`)
/// has to be initialized after calling this.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("REXPORT_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
