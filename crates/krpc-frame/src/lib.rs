//! Varint length-prefixed message framing for krpc channels.
//!
//! Every message on both the call channel and the stream channel is a single
//! protobuf blob preceded by its length, encoded as a base-128 varint. This crate
//! turns a byte stream into whole messages and back.
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, encoded_len_prefix, FrameConfig, DEFAULT_MAX_PAYLOAD,
    MAX_PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
