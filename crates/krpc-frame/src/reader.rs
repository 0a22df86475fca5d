use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use krpc_transport::RpcStream;
use tracing::trace;

use crate::codec::{decode_frame, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Pulls whole messages off a byte stream.
///
/// Bytes that arrive ahead of a complete message are kept between calls, so a
/// read that times out can simply be retried.
pub struct FrameReader<T> {
    inner: T,
    pending: BytesMut,
    max_payload: usize,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Only `max_payload_size` is used; socket timeouts need [`FrameReader::with_config_rpc`].
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::new(),
            max_payload: config.max_payload_size,
        }
    }

    /// Block until the next message is complete and return its payload.
    ///
    /// End of stream yields [`FrameError::ConnectionClosed`] on a message
    /// boundary and [`FrameError::Truncated`] anywhere else.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(message) = decode_frame(&mut self.pending, self.max_payload)? {
                trace!(len = message.len(), "frame read");
                return Ok(message);
            }

            if self.fill()? == 0 {
                return Err(match self.pending.len() {
                    0 => FrameError::ConnectionClosed,
                    buffered => FrameError::Truncated { buffered },
                });
            }
        }
    }

    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(read) => {
                    self.pending.extend_from_slice(&chunk[..read]);
                    return Ok(read);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl FrameReader<RpcStream> {
    /// Wrap a socket and apply the configured read timeout to it.
    pub fn with_config_rpc(inner: RpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.inner.set_read_timeout(timeout)?)
    }
}
