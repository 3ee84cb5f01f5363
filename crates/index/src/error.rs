use batchtrace_model::EntityKind;
use batchtrace_source::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Identifier collision across the four hierarchical kinds; the build
    /// aborts so no partial index escapes.
    #[error("duplicate identifier {id:?} while indexing {kind} records")]
    DuplicateIdentifier { id: String, kind: EntityKind },

    /// A snapshot that failed structural validation.
    #[error("snapshot failed validation: {0}")]
    CorruptSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
