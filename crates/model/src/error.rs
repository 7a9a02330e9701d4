use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be delivered, or the connection broke while
    /// waiting for the response.
    Transport,
    /// The endpoint answered with a non-success status.
    Status,
    /// The response body doesn't carry the expected completion text.
    MalformedResponse,
    /// The request was rejected before being sent.
    InvalidRequest,
    /// The provider gave up waiting for the endpoint.
    Timeout,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Status => write!(f, "error status"),
            ErrorKind::MalformedResponse => write!(f, "malformed response"),
            ErrorKind::InvalidRequest => write!(f, "invalid request"),
            ErrorKind::Timeout => write!(f, "timed out"),
        }
    }
}
