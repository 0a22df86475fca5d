/// Errors produced when a value payload does not match the expected type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload ended before the value was complete.
    #[error("truncated {kind} value")]
    Truncated { kind: &'static str },

    /// A varint was longer than ten bytes or otherwise malformed.
    #[error("malformed varint in {kind} value")]
    Varint { kind: &'static str },

    /// Bytes remained after a complete scalar value.
    #[error("{count} trailing bytes after {kind} value")]
    TrailingBytes { kind: &'static str, count: usize },

    /// A string payload is not valid UTF-8.
    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    /// A boolean payload held something other than 0 or 1.
    #[error("invalid boolean value {0}")]
    InvalidBool(u64),

    /// An integer does not fit the target type.
    #[error("integer {value} out of range for {kind}")]
    OutOfRange { kind: &'static str, value: i128 },

    /// A tuple container held the wrong number of items.
    #[error("expected {expected} tuple items, found {found}")]
    TupleArity { expected: usize, found: usize },

    /// A collection or message container failed to parse.
    #[error("malformed {kind}: {message}")]
    Container { kind: &'static str, message: String },
}

impl DecodeError {
    pub(crate) fn container(kind: &'static str, err: prost::DecodeError) -> Self {
        Self::Container {
            kind,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
