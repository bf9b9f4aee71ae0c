//! Error type for message building

use std::{io, path::PathBuf};

use thiserror::Error;

/// The ways building a [`Message`](super::Message) can fail
///
/// The file checks are made first, in this order: existence, size, read.
#[derive(Debug, Error)]
pub enum Error {
    /// The message file does not exist
    #[error("File {} not found!", .0.display())]
    FileNotFound(PathBuf),
    /// The message file exists but has a size of zero
    #[error("File {} is empty!", .0.display())]
    EmptyFile(PathBuf),
    /// The message file exists and is not empty, but can't be read as text
    #[error("Can't open {}", .path.display())]
    Io {
        /// Path of the message file
        path: PathBuf,
        /// Underlying read error
        source: io::Error,
    },
    /// Missing sender address
    #[error("missing sender address")]
    MissingFrom,
    /// Missing subject
    #[error("missing subject")]
    MissingSubject,
    /// Missing destination address
    #[error("missing destination address")]
    MissingTo,
    /// An address that can't be carried in a header
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
}

impl Error {
    /// Whether the error comes from reading the message file
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound(_) | Error::EmptyFile(_) | Error::Io { .. }
        )
    }
}
