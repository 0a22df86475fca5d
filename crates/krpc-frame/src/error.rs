use std::io::ErrorKind;

use krpc_transport::TransportError;

/// Failures while turning a byte stream into messages or back.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The length varint runs past ten bytes or overflows a u64.
    #[error("malformed varint length prefix")]
    InvalidPrefix,

    /// A frame announced, or a caller tried to send, more than the limit.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// The peer hung up between two frames.
    #[error("channel closed by peer")]
    ConnectionClosed,

    /// The peer hung up part way through a frame.
    #[error("channel closed mid-message ({buffered} bytes of a partial frame)")]
    Truncated { buffered: usize },

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Socket options could not be applied.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// Whether a socket timeout expired. The stream stays usable and no
    /// buffered bytes are lost.
    pub fn is_timeout(&self) -> bool {
        let io = match self {
            Self::Io(err) | Self::Transport(TransportError::Io(err)) => err,
            _ => return false,
        };
        matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
    }

    /// Whether the peer went away, cleanly or not.
    pub fn is_hangup(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::Truncated { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                ErrorKind::ConnectionReset | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
