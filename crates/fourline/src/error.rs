//! Unified error type for the fourline server.

use fourline_lobby::LobbyError;
use fourline_protocol::ProtocolError;
use fourline_session::{SessionError, StoreError};
use fourline_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` conversions let `?` lift sub-crate errors straight into
/// this type inside the server and connection handler.
#[derive(Debug, thiserror::Error)]
pub enum FourlineError {
    /// Connection, send, or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session operation was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A queue request was rejected.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The match store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The server could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A configuration value could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held something that doesn't parse.
    #[error("{var}={value:?} is invalid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use fourline_protocol::SessionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let fourline_err: FourlineError = err.into();
        assert!(matches!(fourline_err, FourlineError::Transport(_)));
        assert!(fourline_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let fourline_err: FourlineError = err.into();
        assert!(matches!(fourline_err, FourlineError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotFound(SessionId::new("s-404"));
        let fourline_err: FourlineError = err.into();
        assert!(matches!(fourline_err, FourlineError::Session(_)));
        assert!(fourline_err.to_string().contains("s-404"));
    }

    #[test]
    fn test_from_lobby_error() {
        let fourline_err: FourlineError = LobbyError::EmptyDisplayName.into();
        assert!(matches!(fourline_err, FourlineError::Lobby(_)));
    }

    #[test]
    fn test_config_error_names_the_variable() {
        let err = ConfigError::InvalidValue {
            var: "PORT",
            value: "eighty".into(),
            reason: "not a number".into(),
        };
        let fourline_err: FourlineError = err.into();
        assert_eq!(
            fourline_err.to_string(),
            "PORT=\"eighty\" is invalid: not a number"
        );
    }
}
