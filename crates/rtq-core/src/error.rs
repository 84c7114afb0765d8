use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one row of a delimited log into a sample.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("row has {len} fields, column {column} requested")]
    MissingColumn { column: usize, len: usize },
    #[error("field `{field}` has no `label:value` form")]
    MissingLabel { field: String },
    #[error("field `{field}` is not a number")]
    InvalidNumber { field: String },
}

/// Failure to read a log or trace file.
#[derive(Debug, Error)]
pub enum LogError {
    /// The file does not exist. Callers skip optional sources on this variant.
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to decode trace {}", path.display())]
    Trace {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("found {count} trace files in {}, expected at most one", dir.display())]
    AmbiguousTrace { dir: PathBuf, count: usize },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            LogError::NotFound { path }
        } else {
            LogError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LogError::NotFound { .. })
    }
}
