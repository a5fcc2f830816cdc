use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error(transparent)]
    IdArray(#[from] IdArrayError),
}

/// Errors from decoding an aggregated id list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdArrayError {
    #[error("id array is empty input")]
    Empty,

    #[error("id array must be enclosed in '{{}}' or '[]', got {0:?}")]
    MissingBrackets(String),

    #[error("invalid id {value:?} at position {position}")]
    InvalidElement { position: usize, value: String },
}
