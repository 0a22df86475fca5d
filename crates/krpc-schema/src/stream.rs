use crate::rpc::ProcedureResult;

/// Batch of pushed values sent on the stream channel.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamUpdate {
    #[prost(message, repeated, tag = "1")]
    pub results: ::prost::alloc::vec::Vec<StreamResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamResult {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, optional, tag = "2")]
    pub result: ::core::option::Option<ProcedureResult>,
}

/// Returned by stream registration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Stream {
    #[prost(uint64, tag = "1")]
    pub id: u64,
}

/// Returned by event registration: the boolean stream backing the event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(message, optional, tag = "1")]
    pub stream: ::core::option::Option<Stream>,
}
