//! Error types shared by the signer, the API client and its collaborators.

pub use crate::avatar::AvatarError;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Consumer or token credentials are missing or malformed.
    #[error("Invalid credentials: {reason}.")]
    InvalidCredentials { reason: String },
    /// The request cannot be signed or dispatched as described.
    #[error("Invalid request: {reason}.")]
    InvalidRequest { reason: String },
    /// Network, TLS or timeout failure before an HTTP status was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The provider answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The provider answered 2xx with a body that is not JSON.
    #[error("Invalid server response.")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    /// No avatar could be selected.
    #[error(transparent)]
    Avatar(#[from] AvatarError),
}

impl Error {
    pub(crate) fn invalid_credentials(reason: impl Into<String>) -> Self {
        Error::InvalidCredentials {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Error::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// HTTP status carried by the error, when the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Transport-level failures (DNS, TCP, TLS, timeout).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP client could not be constructed.
    #[error("HTTP client could not be constructed.")]
    Build {
        #[source]
        source: BoxError,
    },
    /// Underlying HTTP client reported a network failure.
    #[error("Server error: {source}")]
    Network {
        #[source]
        source: BoxError,
    },
    /// Underlying IO failure surfaced during transport.
    #[error("I/O error occurred during the request.")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Wraps a transport-specific network error.
    pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
        TransportError::Network {
            source: Box::new(src),
        }
    }

    pub fn build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
        TransportError::Build {
            source: Box::new(src),
        }
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::network(e)
    }
}

#[test]
fn test_status() {
    let api = Error::Api {
        status: 401,
        message: "Could not authenticate you.".into(),
    };
    assert_eq!(api.status(), Some(401));
    assert_eq!(api.to_string(), "Could not authenticate you.");
    assert_eq!(Error::invalid_request("x").status(), None);
}
