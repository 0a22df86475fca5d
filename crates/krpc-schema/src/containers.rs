//! Containers the value codec wraps collection elements in.
//!
//! Each element is encoded independently and stored as an opaque byte string.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct List {
    #[prost(bytes = "bytes", repeated, tag = "1")]
    pub items: ::prost::alloc::vec::Vec<::bytes::Bytes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Set {
    #[prost(bytes = "bytes", repeated, tag = "1")]
    pub items: ::prost::alloc::vec::Vec<::bytes::Bytes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tuple {
    #[prost(bytes = "bytes", repeated, tag = "1")]
    pub items: ::prost::alloc::vec::Vec<::bytes::Bytes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Dictionary {
    #[prost(message, repeated, tag = "1")]
    pub entries: ::prost::alloc::vec::Vec<DictionaryEntry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DictionaryEntry {
    #[prost(bytes = "bytes", tag = "1")]
    pub key: ::bytes::Bytes,
    #[prost(bytes = "bytes", tag = "2")]
    pub value: ::bytes::Bytes,
}
