use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected document shape in {path}: expected {expected}")]
    Shape { path: PathBuf, expected: &'static str },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

// A single raw record that could not be brought up to the current schema.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("record id is not a non-negative integer")]
    InvalidId,

    #[error("record does not match the task schema: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(u64),

    #[error("title required")]
    EmptyTitle,

    #[error("tag required")]
    EmptyTag,

    #[error("invalid date '{0}', expected yyyy-MM-dd")]
    InvalidDate(String),

    #[error("invalid priority '{0}', expected high, medium or low")]
    InvalidPriority(String),

    #[error("no task id left after {0}")]
    IdsExhausted(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}
