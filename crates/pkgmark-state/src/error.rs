use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkError {
    #[error("{0}")]
    Usage(String),

    #[error("{name} is not installed")]
    NotInstalled { name: String },

    #[error("install receipt for {name} does not exist: {}", path.display())]
    MissingRecord { name: String, path: PathBuf },

    #[error(
        "package '{name}' is locked by another operation; remove {} if no other pkgmark process is running",
        path.display()
    )]
    Locked { name: String, path: PathBuf },

    #[error("failed to persist install receipt for {name}")]
    Persistence {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl MarkError {
    /// Process exit status for this error when surfaced by a command.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}
