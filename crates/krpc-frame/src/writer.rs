use std::io::{self, ErrorKind, Write};
use std::time::Duration;

use bytes::BytesMut;
use krpc_transport::RpcStream;
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Sends each payload as one length-prefixed message.
pub struct FrameWriter<T> {
    inner: T,
    scratch: BytesMut,
    max_payload: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Only `max_payload_size` is used; socket timeouts need [`FrameWriter::with_config_rpc`].
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            scratch: BytesMut::new(),
            max_payload: config.max_payload_size,
        }
    }

    /// Write prefix and payload in full, then flush.
    ///
    /// A socket timeout surfaces as an error for which
    /// [`FrameError::is_timeout`] holds; the message may be partly sent.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }

        self.scratch.clear();
        encode_frame(payload, &mut self.scratch);
        self.inner.write_all(&self.scratch).map_err(write_error)?;
        self.inner.flush().map_err(write_error)?;

        trace!(len = payload.len(), "frame written");
        Ok(())
    }
}

impl FrameWriter<RpcStream> {
    /// Wrap a socket and apply the configured write timeout to it.
    pub fn with_config_rpc(inner: RpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.inner.set_write_timeout(timeout)?)
    }
}

fn write_error(err: io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WriteZero => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}
