use std::time::Duration;

use krpc_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};

use crate::error::{ClientError, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 50000;
pub const DEFAULT_STREAM_PORT: u16 = 50001;
/// Longest client name the server accepts, in UTF-8 bytes.
pub const MAX_CLIENT_NAME_LEN: usize = 32;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for [`Client::connect`](crate::Client::connect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Port of the call channel.
    pub rpc_port: u16,
    /// Port of the stream channel. `None` connects without streams.
    pub stream_port: Option<u16>,
    /// Name shown by the server for this client.
    pub client_name: String,
    /// Bound on each blocking step of the handshake.
    pub handshake_timeout: Duration,
    /// Largest message accepted from the server once connected.
    pub max_message_size: usize,
    /// Socket-level bound on waiting for a call response. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            stream_port: Some(DEFAULT_STREAM_PORT),
            client_name: String::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_message_size: DEFAULT_MAX_PAYLOAD,
            call_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_rpc_port(mut self, port: u16) -> Self {
        self.rpc_port = port;
        self
    }

    pub fn with_stream_port(mut self, port: u16) -> Self {
        self.stream_port = Some(port);
        self
    }

    /// Connect the call channel only.
    pub fn without_streams(mut self) -> Self {
        self.stream_port = None;
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Check limits that can be enforced before touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ClientError::Connection("host must not be empty".into()));
        }
        if self.client_name.len() > MAX_CLIENT_NAME_LEN {
            return Err(ClientError::Connection(format!(
                "client name is {} bytes (max {MAX_CLIENT_NAME_LEN})",
                self.client_name.len()
            )));
        }
        if self.handshake_timeout.is_zero() {
            return Err(ClientError::Connection(
                "handshake timeout must be non-zero".into(),
            ));
        }
        if matches!(self.call_timeout, Some(t) if t.is_zero()) {
            return Err(ClientError::Connection("call timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// Frame settings used while the handshake is in progress.
    pub(crate) fn handshake_frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_message_size,
            read_timeout: Some(self.handshake_timeout),
            write_timeout: Some(self.handshake_timeout),
        }
    }
}
