use std::time::Duration;

use krpc_frame::FrameError;
use krpc_transport::TransportError;

use crate::codec::DecodeError;

/// Errors returned by the client runtime.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error, including I/O failures on an established channel.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The handshake was rejected or could not be completed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The client was closed locally.
    #[error("connection closed")]
    ConnectionClosed,

    /// A channel failed underneath the client.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// A server error with no registered exception type.
    #[error("{}", rpc_message(.service, .name, .message))]
    Rpc {
        service: String,
        name: String,
        message: String,
        stack_trace: Option<String>,
    },

    /// A server error translated by a registered exception factory.
    #[error("{service}.{name}: {source}")]
    Service {
        service: String,
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A result payload did not decode as the expected type.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A protobuf envelope from the server was malformed.
    #[error("malformed message: {0}")]
    Message(#[from] prost::DecodeError),

    /// The server broke the request/response contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The stream id is not registered with this client.
    #[error("stream {0} not found")]
    StreamNotFound(u64),

    /// The client was connected without a stream channel.
    #[error("stream channel not connected")]
    StreamsUnavailable,

    /// A bounded wait elapsed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

fn rpc_message(service: &str, name: &str, message: &str) -> String {
    if service.is_empty() && name.is_empty() {
        format!("rpc error: {message}")
    } else {
        format!("{service}.{name}: {message}")
    }
}

impl ClientError {
    /// Borrow the typed exception produced by a registered factory.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Service { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// `(service, name)` of a server-side error, typed or not.
    pub fn remote_tag(&self) -> Option<(&str, &str)> {
        match self {
            Self::Rpc { service, name, .. } | Self::Service { service, name, .. } => {
                Some((service, name))
            }
            _ => None,
        }
    }

    /// Whether the error came from the server rather than the client or link.
    pub fn is_remote(&self) -> bool {
        self.remote_tag().is_some()
    }

    /// Whether the connection is no longer usable.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::Disconnected(_)
                | Self::Transport(_)
                | Self::Frame(
                    FrameError::ConnectionClosed
                        | FrameError::Truncated { .. }
                        | FrameError::Io(_)
                        | FrameError::Transport(_)
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("bad argument: {0}")]
    struct BadArgument(String);

    #[test]
    fn untyped_rpc_error_shows_message() {
        let err = ClientError::Rpc {
            service: String::new(),
            name: String::new(),
            message: "no such procedure".into(),
            stack_trace: None,
        };
        assert_eq!(err.to_string(), "rpc error: no such procedure");
        assert!(err.is_remote());
    }

    #[test]
    fn tagged_rpc_error_shows_tag() {
        let err = ClientError::Rpc {
            service: "Svc".into(),
            name: "Oops".into(),
            message: "boom".into(),
            stack_trace: Some("at Svc.Run".into()),
        };
        assert_eq!(err.to_string(), "Svc.Oops: boom");
        assert_eq!(err.remote_tag(), Some(("Svc", "Oops")));
    }

    #[test]
    fn service_error_downcasts() {
        let err = ClientError::Service {
            service: "Svc".into(),
            name: "BadArgument".into(),
            source: Box::new(BadArgument("x".into())),
        };
        let typed = err.downcast_ref::<BadArgument>().expect("typed exception");
        assert_eq!(typed.0, "x");
        assert!(err.downcast_ref::<std::io::Error>().is_none());
        assert!(ClientError::ConnectionClosed
            .downcast_ref::<BadArgument>()
            .is_none());
    }

    #[test]
    fn disconnect_classification() {
        assert!(ClientError::ConnectionClosed.is_disconnect());
        assert!(ClientError::Frame(FrameError::ConnectionClosed).is_disconnect());
        assert!(ClientError::Frame(FrameError::Truncated { buffered: 4 }).is_disconnect());
        assert!(!ClientError::StreamNotFound(1).is_disconnect());
    }
}
