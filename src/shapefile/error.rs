//! Custom error types for the shapefile-reader crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum ShapefileError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One of the three triad files (.shp, .shx or .dbf) is missing.
    #[error("required shapefile component not found: {0}")]
    MissingFile(PathBuf),

    /// A stream is shorter than its format-mandated header length.
    #[error("truncated {file} header: expected {expected} bytes, found {found}")]
    TruncatedHeader {
        file: &'static str,
        expected: u64,
        found: u64,
    },

    /// A declared file length disagrees with the actual stream size in a way
    /// that makes record offsets unreadable.
    #[error("{file} file length mismatch: header declares {declared} bytes, stream has {actual}")]
    LengthMismatch {
        file: &'static str,
        declared: u64,
        actual: u64,
    },

    /// The main file header carries a shape type code this crate does not know.
    #[error("unknown shape type code in file header: {0}")]
    InvalidShapeType(i32),

    /// A shape record is too short to carry its own record header.
    #[error("malformed shape record {ordinal}: {reason}")]
    MalformedRecord { ordinal: usize, reason: String },

    /// A lookup past the declared shape count.
    #[error("ordinal {ordinal} out of range: shapefile declares {count} records")]
    OrdinalOutOfRange { ordinal: usize, count: usize },

    /// `current()` was invoked before the first successful `advance()` or
    /// after the cursor was exhausted.
    #[error("cursor is not positioned on a record; call advance() first")]
    CursorNotPositioned,

    /// The file is structurally invalid or does not conform to the format.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// A convenience `Result` type alias using the crate's `ShapefileError` type.
pub type Result<T> = std::result::Result<T, ShapefileError>;
