use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::RpcStream;

/// TCP transport.
///
/// Provides bind/accept/connect over TCP. Clients only ever call
/// [`TcpTransport::connect`]; the listening side exists for servers and test
/// doubles speaking the same framing.
pub struct TcpTransport {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on a TCP address. Port 0 picks an ephemeral port.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let label = format!("{addr:?}");
        let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind {
            addr: label.clone(),
            source: e,
        })?;
        let addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: label,
            source: e,
        })?;

        info!(%addr, "listening on tcp");

        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<RpcStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        configure(&stream)?;
        debug!(%peer, "accepted connection");
        Ok(RpcStream::from_tcp(stream))
    }

    /// Connect to `host:port` (blocking), trying each resolved address in turn.
    pub fn connect(host: &str, port: u16) -> Result<RpcStream> {
        let label = format!("{host}:{port}");
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect {
                addr: label.clone(),
                source: e,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::Resolve { addr: label });
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    configure(&stream)?;
                    debug!(%addr, "connected over tcp");
                    return Ok(RpcStream::from_tcp(stream));
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: label,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no address reachable")
            }),
        })
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

// Request/response traffic is small and latency bound.
fn configure(stream: &TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;
    Ok(())
}
