use thiserror::Error;

/// Convenient alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, CsvError>;

#[derive(Error, Debug)]
/// Error raised while parsing, mapping, reading or writing delimited records.
pub enum CsvError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The tokenizer met input it cannot resynchronize from: an unterminated
    /// quoted field, invalid UTF-8, or stray text rejected by the bad-data
    /// policy. Fatal to the current stream.
    #[error("malformed record starting at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A single record grew past the configured buffer limit. Fatal; protects
    /// against unbounded memory growth from pathological input.
    #[error("record starting at line {line} exceeded the buffer limit of {limit} bytes")]
    BufferLimitExceeded { line: u64, limit: usize },

    /// One or more required bindings had no matching column in the header.
    /// Raised once, before any row is produced, listing every missing binding.
    #[error("missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// Two bindings claim the same column without disambiguation.
    #[error("column {column} is claimed by both `{first}` and `{second}`")]
    DuplicateBinding {
        column: String,
        first: String,
        second: String,
    },

    /// No converter is registered for a bound member's type.
    #[error("no converter found for type `{type_name}`")]
    NoConverterFound { type_name: String },

    /// Raw text could not be converted to the target type, or a value could
    /// not be formatted on write. Row-scoped; subsequent rows stay readable.
    #[error("line {line}, column `{column}`: cannot convert {raw:?} to {target}: {reason}")]
    Conversion {
        line: u64,
        column: String,
        raw: String,
        target: String,
        reason: String,
    },

    /// The class map violates a build-time invariant, e.g. a member that is
    /// both bound and ignored, or an unknown member name.
    #[error("invalid mapping for `{type_name}`: {reason}")]
    Configuration { type_name: String, reason: String },
}

impl CsvError {
    /// True for errors the reader cannot recover from by moving to the next
    /// row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CsvError::Io(_)
                | CsvError::MalformedRecord { .. }
                | CsvError::BufferLimitExceeded { .. }
                | CsvError::MissingColumns { .. }
                | CsvError::DuplicateBinding { .. }
        )
    }
}
