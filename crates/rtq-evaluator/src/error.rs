use rtq_core::LogError;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid settings file {}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The quality tool ran but failed; its output is kept in `log`.
    #[error("`{program}` failed ({status}), see {}", log.display())]
    QualityTool {
        program: String,
        status: ExitStatus,
        log: PathBuf,
    },
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}
