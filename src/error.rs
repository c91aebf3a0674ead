//! Error types for record stream processing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a record stream.
///
/// Most per-record conditions (a requested field that is absent, a record
/// lacking an aggregation field) are not errors at all; they are skipped
/// by the modulator. Only the cases below terminate the pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A header-first data line did not have as many values as the header.
    #[error("Header/data length mismatch: {expected} != {actual} in \"{header}\" and \"{line}\"")]
    HeaderDataLengthMismatch {
        expected: usize,
        actual: usize,
        header: String,
        line: String,
    },

    /// A DKVP token had no pair separator, so no name can be recovered.
    #[error("Missing pair separator \"{separator}\" in token \"{token}\" of line \"{line}\" ({location})")]
    MissingPairSeparator {
        separator: String,
        token: String,
        line: String,
        location: String,
    },

    /// A `name=value` assignment without the `=`.
    #[error("Invalid assignment \"{0}\": expected name=value")]
    InvalidAssignment(String),

    /// A separator configured as the empty string.
    #[error("Separator {0} must not be empty")]
    EmptySeparator(String),

    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StreamError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StreamError>;
