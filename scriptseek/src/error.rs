use thiserror::Error;

/// Failure reported by a transport collaborator.
///
/// Never crosses into the query or playback layers: the orchestrator and the
/// bookmark toggler convert it into [`Error::TransportFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("session expired or invalid")]
    Unauthorized,
    #[error("server returned {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl TransportError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Typed outcomes of the search-and-navigation core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    TransportFailure(#[from] TransportError),
    #[error("sign in to bookmark videos")]
    AuthRequired,
    /// Response for a superseded request. Internal, never shown to the user.
    #[error("response for a superseded request was discarded")]
    StaleResponseDiscarded,
    #[error("item {0} is not in the current results")]
    UnknownItem(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_includes_detail_when_present() {
        let err = TransportError::Status {
            status: 500,
            detail: Some("index offline".to_string()),
        };
        assert_eq!(err.to_string(), "server returned 500: index offline");

        let err = TransportError::Status {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "server returned 502");
    }

    #[test]
    fn transport_error_converts_into_core_error() {
        let err: Error = TransportError::Unauthorized.into();
        assert_eq!(err, Error::TransportFailure(TransportError::Unauthorized));
    }
}
