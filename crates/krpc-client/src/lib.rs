//! Client runtime for krpc servers.
//!
//! Connect with a [`Client`], describe procedure calls with [`build_call`],
//! run them with [`Client::invoke`] or [`Client::invoke_batch`], and observe
//! server-side expressions through [`Stream`] and [`Event`]. Argument and
//! result values travel as opaque byte strings produced by the [`codec`].
//!
//! ```no_run
//! use krpc_client::{build_call, encode, Client, ClientConfig};
//!
//! let client = Client::connect(ClientConfig::default().with_client_name("example"))?;
//! let doubled: i32 = client.call(&build_call("TestService", "Double", [encode(&5i32)]))?;
//! assert_eq!(doubled, 10);
//!
//! let counter = client.add_stream::<i32>(&build_call("TestService", "Counter", [encode(&0i32)]))?;
//! println!("counter is {}", counter.get()?);
//! # Ok::<(), krpc_client::ClientError>(())
//! ```

pub mod call;
pub mod client;
pub mod codec;
pub mod config;
mod connection;
pub mod error;
pub mod event;
pub mod exception;
pub mod handshake;
mod invoker;
pub mod object;
pub mod stream;
mod stream_manager;

pub use call::{build_call, CallBuilder, CallDescriptor};
pub use client::Client;
pub use codec::{decode, encode, Decode, DecodeError, Encode, Raw};
pub use config::{
    ClientConfig, DEFAULT_HOST, DEFAULT_RPC_PORT, DEFAULT_STREAM_PORT, MAX_CLIENT_NAME_LEN,
};
pub use connection::ConnectionState;
pub use error::{ClientError, Result};
pub use event::Event;
pub use exception::{ExceptionFactory, ExceptionRegistry};
pub use object::{Object, ObjectType};
pub use stream::Stream;
pub use stream_manager::{StreamFreeze, StreamId};

pub use krpc_schema as schema;

#[doc(hidden)]
pub use bytes;
