//! Call channel ownership and connection lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use krpc_frame::{FrameError, FrameReader, FrameWriter};
use krpc_schema::{Message, Request, Response};
use krpc_transport::{RpcStream, TcpTransport};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::handshake::{handshake_rpc, handshake_stream};

/// Lifecycle of a client connection.
///
/// Dialing and both handshakes happen inside `Client::connect`, so a client
/// that exists is at least `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Connected = 0,
    Closing = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connected,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct CallChannel {
    reader: FrameReader<RpcStream>,
    writer: FrameWriter<RpcStream>,
    /// Set once the channel can no longer be trusted to pair requests with
    /// responses.
    broken: Option<String>,
}

/// Stream channel after its handshake, ready for the background reader.
pub(crate) struct StreamChannel {
    pub(crate) reader: FrameReader<RpcStream>,
    pub(crate) shutdown: RpcStream,
}

/// An open call channel plus the identity the server gave us.
pub(crate) struct Connection {
    config: ClientConfig,
    client_id: Bytes,
    state: AtomicU8,
    calls: Mutex<CallChannel>,
    /// Second handle on the call socket so `close` can interrupt a blocked call.
    shutdown: RpcStream,
}

impl Connection {
    /// Open the call channel and, when configured, the stream channel.
    pub(crate) fn open(config: ClientConfig) -> Result<(Self, Option<StreamChannel>)> {
        config.validate()?;
        debug!(
            host = %config.host,
            rpc_port = config.rpc_port,
            stream_port = ?config.stream_port,
            name = %config.client_name,
            "connecting"
        );

        let stream = TcpTransport::connect(&config.host, config.rpc_port)?;
        let shutdown = stream.try_clone()?;
        let reader_stream = stream.try_clone()?;

        let handshake_frames = config.handshake_frame_config();
        let mut reader = FrameReader::with_config_rpc(reader_stream, handshake_frames.clone())?;
        let mut writer = FrameWriter::with_config_rpc(stream, handshake_frames)?;

        let handshake = handshake_rpc(
            &mut reader,
            &mut writer,
            &config.client_name,
            config.handshake_timeout,
        )?;
        reader.set_read_timeout(config.call_timeout)?;
        writer.set_write_timeout(config.call_timeout)?;

        let streams = match config.stream_port {
            Some(port) => Some(open_stream_channel(
                &config,
                port,
                &handshake.client_identifier,
            )?),
            None => None,
        };

        let conn = Self {
            client_id: handshake.client_identifier,
            state: AtomicU8::new(ConnectionState::Connected as u8),
            calls: Mutex::new(CallChannel {
                reader,
                writer,
                broken: None,
            }),
            shutdown,
            config,
        };
        Ok((conn, streams))
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn client_id(&self) -> &Bytes {
        &self.client_id
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from `Connected` to `Closing`. Returns false when another caller
    /// already started closing.
    pub(crate) fn begin_close(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connected as u8,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Shut the call socket down, failing any blocked call, and mark the
    /// connection closed.
    pub(crate) fn finish_close(&self) {
        if let Err(err) = self.shutdown.shutdown() {
            warn!(error = %err, "call channel shutdown failed");
        }
        self.state
            .store(ConnectionState::Closed as u8, Ordering::Release);
        debug!("connection closed");
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Connected => Ok(()),
            _ => Err(ClientError::ConnectionClosed),
        }
    }

    /// Send one request and wait for its response.
    ///
    /// Only one request is in flight at a time; concurrent callers queue on
    /// the channel lock.
    pub(crate) fn round_trip(&self, request: &Request) -> Result<Response> {
        self.ensure_open()?;
        let mut channel = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_open()?;
        if let Some(reason) = &channel.broken {
            return Err(ClientError::Disconnected(reason.clone()));
        }

        let payload = request.encode_to_vec();
        trace!(calls = request.calls.len(), len = payload.len(), "sending request");
        if let Err(err) = channel.writer.send(&payload) {
            return Err(self.channel_failure(&mut channel, err));
        }

        let response = match channel.reader.read_frame() {
            Ok(frame) => frame,
            Err(err) => return Err(self.channel_failure(&mut channel, err)),
        };
        trace!(len = response.len(), "response received");
        Ok(Response::decode(response)?)
    }

    fn channel_failure(&self, channel: &mut CallChannel, err: FrameError) -> ClientError {
        if self.state() != ConnectionState::Connected {
            return ClientError::ConnectionClosed;
        }
        // After a partial exchange the next response on the wire may belong to
        // this request, so the channel is unusable either way.
        let err = match err {
            err if err.is_timeout() => match self.config.call_timeout {
                Some(timeout) => ClientError::Timeout(timeout),
                None => ClientError::Frame(err),
            },
            other => ClientError::Frame(other),
        };
        warn!(error = %err, "call channel failed");
        channel.broken = Some(err.to_string());
        err
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.host)
            .field("rpc_port", &self.config.rpc_port)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamChannel")
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

fn open_stream_channel(
    config: &ClientConfig,
    port: u16,
    client_identifier: &Bytes,
) -> Result<StreamChannel> {
    let stream = TcpTransport::connect(&config.host, port)?;
    let shutdown = stream.try_clone()?;
    let reader_stream = stream.try_clone()?;

    let handshake_frames = config.handshake_frame_config();
    let mut reader = FrameReader::with_config_rpc(reader_stream, handshake_frames.clone())?;
    let mut writer = FrameWriter::with_config_rpc(stream, handshake_frames)?;

    handshake_stream(
        &mut reader,
        &mut writer,
        client_identifier,
        config.handshake_timeout,
    )?;
    // The reader thread blocks until updates arrive or the socket shuts down.
    reader.set_read_timeout(None)?;

    Ok(StreamChannel { reader, shutdown })
}
