use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path: {} does not exist or is not a directory", .0.display())]
    InvalidPath(PathBuf),

    #[error("Unreadable file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Text extraction failed for {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Failed to organize {}: {source}", path.display())]
    OrganizeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::ExtractionFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
