/// First message a client sends on either channel.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionRequest {
    #[prost(enumeration = "connection_request::Type", tag = "1")]
    pub r#type: i32,
    /// Display name, call channel only.
    #[prost(string, tag = "2")]
    pub client_name: ::prost::alloc::string::String,
    /// Identifier issued on the call channel, stream channel only.
    #[prost(bytes = "bytes", tag = "3")]
    pub client_identifier: ::bytes::Bytes,
}

pub mod connection_request {
    /// Which channel a connection request opens.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Rpc = 0,
        Stream = 1,
    }
}

/// Server reply to a [`ConnectionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionResponse {
    #[prost(enumeration = "connection_response::Status", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "3")]
    pub client_identifier: ::bytes::Bytes,
}

pub mod connection_response {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Status {
        Ok = 0,
        MalformedMessage = 1,
        Timeout = 2,
        WrongType = 3,
    }
}

impl ConnectionRequest {
    /// Request opening the call channel under a display name.
    pub fn rpc(client_name: impl Into<String>) -> Self {
        Self {
            r#type: connection_request::Type::Rpc as i32,
            client_name: client_name.into(),
            client_identifier: ::bytes::Bytes::new(),
        }
    }

    /// Request opening the stream channel for an identified client.
    pub fn stream(client_identifier: ::bytes::Bytes) -> Self {
        Self {
            r#type: connection_request::Type::Stream as i32,
            client_name: String::new(),
            client_identifier,
        }
    }
}
