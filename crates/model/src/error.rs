use thiserror::Error;

/// Errors raised by the shared data model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A kind name outside the four hierarchical kinds.
    #[error("unknown kind {given:?}; expected one of: step, sequence, operation, function")]
    InvalidKind { given: String },

    /// A record without a textual `id` field.
    #[error("record is missing required text field \"id\"")]
    MissingId,
}

pub type Result<T> = std::result::Result<T, ModelError>;
