use std::io;
use thiserror::Error;
use tokio::time::error::Elapsed as TimeElapsed;

use crate::protocol::StatusCode;

pub type SftpResult<T> = Result<T, Error>;

/// Enum for client errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Failure reported by the transport collaborator
    #[error("{code}: {message}")]
    Transport { code: StatusCode, message: String },
    /// Any errors related to local I/O
    #[error("I/O: {0}")]
    IO(String),
    /// Time limit for a transport request exceeded
    #[error("Timeout")]
    Timeout,
    /// A listing line, mode field or timestamp could not be parsed
    #[error("Malformed listing line {line:?}: {reason}")]
    Parse { line: String, reason: String },
    /// The named path is not among the entries of its parent directory
    #[error("No such file or directory: {0}")]
    NotFound(String),
    /// Destination entries already exist and the conflict policy is `Error`
    #[error("Destination already exists: {}", .0.join(", "))]
    Conflict(Vec<String>),
    /// The operation cannot start, e.g. the destination is not a directory
    #[error("{0}")]
    Precondition(String),
    #[error("Invalid URI {0}")]
    InvalidUri(String),
}

impl Error {
    pub fn transport<M: Into<String>>(code: StatusCode, message: M) -> Self {
        Self::Transport {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn parse<L: Into<String>, R: Into<String>>(line: L, reason: R) -> Self {
        Self::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means the path does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Transport { code, .. } => *code == StatusCode::NoSuchFile,
            _ => false,
        }
    }

    /// Returns `true` if the transport refused access to the path
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                code: StatusCode::PermissionDenied,
                ..
            }
        )
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(error.to_string()),
            _ => Self::IO(error.to_string()),
        }
    }
}

impl From<TimeElapsed> for Error {
    fn from(_: TimeElapsed) -> Self {
        Self::Timeout
    }
}
