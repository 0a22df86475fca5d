//! Blocking TCP transport for krpc.
//!
//! A krpc server exposes two TCP endpoints: the call channel, where requests and
//! responses alternate, and the stream channel, where the server pushes updates.
//! Both use the same [`RpcStream`] type provided here.
//!
//! This is the lowest layer of krpc. Everything else builds on top of it.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::TcpTransport;
pub use traits::RpcStream;
