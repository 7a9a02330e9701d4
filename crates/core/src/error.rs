use std::path::PathBuf;
use std::time::Duration;

use ideaflow_model::{ErrorKind, ModelProviderError};
use thiserror::Error;

/// A completion request that produced no usable text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompletionFailure {
    /// The conversation had no turns, so nothing was sent.
    #[error("cannot complete an empty conversation")]
    EmptyConversation,
    /// The request never reached the endpoint, or the connection broke.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status.
    #[error("completion endpoint rejected the request: {0}")]
    Status(String),
    /// The endpoint answered without the completion text.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    /// No answer arrived within the allowed time.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
}

impl CompletionFailure {
    pub(crate) fn from_provider(
        err: &dyn ModelProviderError,
        timeout: Duration,
    ) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Transport => Self::Transport(message),
            ErrorKind::Status => Self::Status(message),
            ErrorKind::MalformedResponse => Self::MalformedResponse(message),
            ErrorKind::InvalidRequest => Self::Status(message),
            ErrorKind::Timeout => Self::Timeout(timeout),
        }
    }
}

/// Why end-of-brainstorm was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HandoffError {
    /// The app name or idea is missing.
    #[error("app name and idea must both be set")]
    IncompleteMetadata,
    /// The transcript has already been handed off.
    #[error("the brainstorm has already ended")]
    AlreadyEnded,
    /// The session was closed before it could hand off.
    #[error("the session is closed")]
    SessionClosed,
}

/// Why a diagram could not be exported.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No diagram has been generated yet.
    #[error("there is no diagram to export yet")]
    NothingToExport,
    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors from a [`crate::RecordStore`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record has the given id.
    #[error("no session record with id {0}")]
    NotFound(String),
}
