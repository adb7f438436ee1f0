use std::io;
use thiserror::Error;

/// type alias for all operations on a [`CsvTable`] or the server that could fail with a
/// [`TableError`]
///
/// [`CsvTable`]: ./struct.CsvTable.html
pub type Result<T> = std::result::Result<T, TableError>;

/// The Error variants used throughout tabledb.
///
/// Some of these are routine outcomes of a request (`NotFound`, `DuplicateIdentity`) and are
/// turned into a `Request Failed` response by the router instead of being treated as fatal.
#[derive(Error, Debug)]
pub enum TableError {
    /// a record kind name did not resolve to a registered schema
    #[error("unknown record kind: {0}")]
    UnknownKind(String),

    /// a persisted row could not be converted into a record
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow {
        /// zero based line number within the table file (0 is the header)
        line: usize,
        /// what was wrong with the row
        reason: String,
    },

    /// the identity is already present in the table
    #[error("duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// the identity is not present in the table
    #[error("identity not found: {0}")]
    NotFound(String),

    /// a field name is not declared by the record kind
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// the value does not fit the kind of the field it is written to
    #[error("invalid value {value:?} for field {field}")]
    InvalidValue {
        /// the field being written
        field: String,
        /// the rejected raw value
        value: String,
    },

    /// a record kind definition is not usable
    #[error("invalid schema for {kind}: {reason}")]
    InvalidSchema {
        /// the record kind being registered
        kind: String,
        /// what was wrong with it
        reason: String,
    },

    /// no unused identifier was found within the retry bound
    #[error("could not generate a unique identifier after {0} attempts")]
    GenerationExhausted(u32),

    /// the maximum number of concurrent sessions are already active
    #[error("capacity exceeded, {max} sessions already active")]
    CapacityExceeded {
        /// configured maximum of concurrent sessions
        max: usize,
    },

    /// a ranking range is not a valid 1-based inclusive range
    #[error("invalid rank range {from}..={to}")]
    InvalidRange {
        /// first requested rank
        from: usize,
        /// last requested rank
        to: usize,
    },

    /// an argument to an operation was not usable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// reading or writing a backing file failed
    #[error("persistence I/O error: {0}")]
    PersistenceIo(#[from] io::Error),

    /// Serde Error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// the request envelope could not be decoded
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// the request named an operation the router does not know
    #[error("unrecognized operation: {0}")]
    UnrecognizedOperation(String),

    /// the server configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// the peer did not speak the expected protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// the server could not be reached or the connection broke off
    #[error("transport error: {0}")]
    Transport(String),

    /// a command line or configuration value could not be parsed
    #[error("parsing error: {0}")]
    Parsing(String),
}
