//! Error types for grab core

use grab_types::{ErrorKind, TransferOutcome};
use thiserror::Error;

/// Errors that can occur while resolving or running a transfer
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("Cannot tell how to fetch '{0}': not a URL, magnet link or existing file")]
    Unresolvable(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Torrent not found: {url} returned {status}")]
    NotFound { url: String, status: u16 },

    #[error("Invalid torrent file: {0}")]
    InvalidDescriptor(String),

    #[error("Timed out after {0}s waiting for torrent metadata")]
    MetadataTimeout(u64),

    #[error("Torrent engine error: {0}")]
    SwarmProvider(String),
}

impl GrabError {
    /// Wrap a provider failure, keeping the full cause chain
    pub fn provider(err: impl std::fmt::Display) -> Self {
        GrabError::SwarmProvider(format!("{:#}", err))
    }

    /// The taxonomy entry reported to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrabError::Unresolvable(_) => ErrorKind::Unresolvable,
            GrabError::Network(_) | GrabError::ServerError { .. } => ErrorKind::Http,
            GrabError::Io(_) => ErrorKind::Io,
            GrabError::NotFound { .. } => ErrorKind::NotFound,
            GrabError::InvalidDescriptor(_) => ErrorKind::InvalidDescriptor,
            GrabError::MetadataTimeout(_) => ErrorKind::MetadataTimeout,
            GrabError::SwarmProvider(_) => ErrorKind::SwarmProvider,
        }
    }
}

impl From<GrabError> for TransferOutcome {
    fn from(error: GrabError) -> Self {
        TransferOutcome::failed(error.kind(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = GrabError::ServerError {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(GrabError::MetadataTimeout(60).kind(), ErrorKind::MetadataTimeout);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(GrabError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_outcome_keeps_message() {
        let outcome: TransferOutcome = GrabError::provider("tracker unreachable").into();
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::SwarmProvider));
        assert!(outcome.error.unwrap().message.contains("tracker unreachable"));
    }
}
