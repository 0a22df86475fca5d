//! Blocking client for krpc servers.
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP connections for the call and stream channels
//! - [`frame`] — Varint length-prefixed message framing
//! - [`schema`] — Protocol messages
//! - [`client`] — Connection, calls, typed errors and streams (behind `client` feature)
//! - [`hex`] — Hex helpers for inspecting raw values

pub mod hex;

/// Re-export transport types.
pub mod transport {
    pub use krpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use krpc_frame::*;
}

/// Re-export protocol messages.
pub mod schema {
    pub use krpc_schema::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use krpc_client::*;
}

#[cfg(feature = "client")]
pub use krpc_client::{
    build_call, decode, encode, remote_enum, CallDescriptor, Client, ClientConfig, ClientError,
    Decode, Encode, Event, Object, ObjectType, Stream,
};
