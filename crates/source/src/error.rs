use batchtrace_model::Collection;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the data-source boundary.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Backing data for a collection is missing or unreadable. Fatal to an
    /// index build.
    #[error("collection {collection} unavailable at {}: {source}", path.display())]
    Unavailable {
        collection: Collection,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record failed the shape contract; loading aborts on the first one.
    #[error("malformed record #{position} in collection {collection}: {reason}")]
    MalformedRecord {
        collection: Collection,
        position: usize,
        reason: String,
    },

    /// Collection payload that is not a JSON array of records.
    #[error("collection {collection} is not a JSON array of records: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    /// A requested sensor column the table does not carry.
    #[error("unknown sensor column {0:?}")]
    UnknownColumn(String),

    /// A persisted sensor table written by an incompatible version.
    #[error("unsupported sensor table schema_version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("sensor table I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("sensor table decode: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
