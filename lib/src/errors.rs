//! Error type shared by decoding, pagination and export.

use std::fmt;
use std::io;

use valueid::ValueError;

use crate::export::{MediaType, QueryKind};

#[derive(Debug)]
pub enum ExportError {
    /// The requested format cannot represent results of this query form.
    UnsupportedFormat { format: MediaType, kind: QueryKind },
    /// The export was cancelled or ran past its deadline.
    Cancelled(String),
    Value(ValueError),
    /// A vocabulary or local vocabulary index could not be resolved.
    Vocabulary(String),
    /// The upstream block source failed.
    Execution(String),
    Io(io::Error),
    Json(serde_json::Error),
    Config(String),
}

impl ExportError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExportError::Cancelled(_))
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportError::UnsupportedFormat { format, kind } => write!(
                f,
                "{} queries cannot be exported as {}",
                kind,
                format.name()
            ),
            ExportError::Cancelled(m) => write!(f, "Query was cancelled: {}", m),
            ExportError::Value(e) => write!(f, "{}", e),
            ExportError::Vocabulary(m) => write!(f, "Vocabulary lookup failed: {}", m),
            ExportError::Execution(m) => write!(f, "Query execution failed: {}", m),
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Json(e) => write!(f, "JSON error: {}", e),
            ExportError::Config(m) => write!(f, "Invalid configuration: {}", m),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Value(e) => Some(e),
            ExportError::Io(e) => Some(e),
            ExportError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValueError> for ExportError {
    fn from(e: ValueError) -> Self {
        ExportError::Value(e)
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
