use batchtrace_model::ModelError;
use batchtrace_source::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Per-query errors. None of these touch the shared index: a failed query
/// leaves the engine exactly as it was.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A kind name outside the four hierarchical kinds.
    #[error(transparent)]
    InvalidKind(#[from] ModelError),

    /// The record reports neither execution-window bound, so there is no
    /// interval to correlate against.
    #[error("record {id:?} has no execution window (neither start nor end reported)")]
    NoExecutionWindow { id: String },

    /// Record-source or sensor-reader failure.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// No operator record mentions the step label.
    #[error("no operator record mentions step {step:?}")]
    StepNotWorked { step: String },

    /// The operator record for a step lacks a reported date field.
    #[error("operator record for step {step:?} is missing field {field:?}")]
    MissingOperatorDate { step: String, field: &'static str },

    /// An operator-reported date string that does not parse.
    #[error("unparseable operator date {value:?} for step {step:?}: {source}")]
    OperatorDate {
        step: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
