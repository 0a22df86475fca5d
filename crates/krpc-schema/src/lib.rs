//! Protobuf message definitions for the krpc wire protocol.
//!
//! Messages are declared with `prost` derives rather than generated from a
//! `.proto` file, so building the workspace needs no `protoc`. Field numbers
//! match the server's protocol definition and must not change.

pub mod connection;
pub mod containers;
pub mod rpc;
pub mod stream;

pub use connection::{
    connection_request, connection_response, ConnectionRequest, ConnectionResponse,
};
pub use containers::{Dictionary, DictionaryEntry, List, Set, Tuple};
pub use rpc::{Argument, Error, ProcedureCall, ProcedureResult, Request, Response};
pub use stream::{Event, Stream, StreamResult, StreamUpdate};

pub use prost::{DecodeError, Message};
