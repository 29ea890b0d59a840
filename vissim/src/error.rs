use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Anything that stops a whole file from being converted. Problems with individual rows are
/// recorded as a `RowDecodeFailure` on the resulting table instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid reference frame: {0}")]
    InvalidReferenceFrame(String),
    #[error("malformed network document: {0}")]
    MalformedNetworkDocument(String),
    #[error("couldn't find the {marker:?} header row")]
    HeaderNotFound { marker: String },
    #[error("no run date on line {line}: {reason}")]
    MissingRunDate { line: usize, reason: String },
    #[error("reading {input}: {source}")]
    Io {
        input: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(input: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            input: input.into(),
            source,
        }
    }
}

/// One row that was kept, but missing some derived field.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
#[error("row {row}, column {column:?}: {reason}")]
pub struct RowDecodeFailure {
    /// 0-based index into the table's rows
    pub row: usize,
    pub column: String,
    pub reason: String,
}
