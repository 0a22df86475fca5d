//! Call descriptors.
//!
//! A [`CallDescriptor`] names a remote procedure and carries its arguments,
//! already encoded. It is built once and never changes afterwards: the same
//! descriptor can be invoked repeatedly, batched, or handed to the stream
//! manager as the expression a stream re-evaluates.

use std::fmt;

use bytes::{Bytes, BytesMut};
use krpc_schema::{Argument, Message, ProcedureCall};

use crate::codec::{self, Decode, DecodeError, Encode};

/// Immutable description of one procedure call.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallDescriptor {
    service: String,
    procedure: String,
    arguments: Vec<(u32, Bytes)>,
}

/// Build a descriptor from positional, pre-encoded arguments.
///
/// Performs no arity or type checking: the server is the authority on
/// signatures. Trailing arguments that have server-side defaults may simply be
/// left off.
pub fn build_call<I>(
    service: impl Into<String>,
    procedure: impl Into<String>,
    args: I,
) -> CallDescriptor
where
    I: IntoIterator,
    I::Item: Into<Bytes>,
{
    CallDescriptor {
        service: service.into(),
        procedure: procedure.into(),
        arguments: args
            .into_iter()
            .enumerate()
            .map(|(position, value)| (position as u32, value.into()))
            .collect(),
    }
}

impl CallDescriptor {
    /// Start building a descriptor argument by argument.
    pub fn builder(service: impl Into<String>, procedure: impl Into<String>) -> CallBuilder {
        CallBuilder {
            call: CallDescriptor {
                service: service.into(),
                procedure: procedure.into(),
                arguments: Vec::new(),
            },
            next_position: 0,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    /// Encoded arguments with their positions, in ascending position order.
    pub fn arguments(&self) -> impl ExactSizeIterator<Item = (u32, &Bytes)> + '_ {
        self.arguments.iter().map(|(position, value)| (*position, value))
    }

    /// Encoded argument at `position`, if it was supplied.
    pub fn argument(&self, position: u32) -> Option<&Bytes> {
        self.arguments
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, value)| value)
    }

    /// Return a copy of this call with the argument at `position` set.
    ///
    /// Replaces an existing argument at the same position. Positions stay in
    /// ascending order, so a middle default can be skipped by never setting it.
    #[must_use]
    pub fn with_argument(mut self, position: u32, value: impl Into<Bytes>) -> Self {
        let value = value.into();
        match self.arguments.binary_search_by_key(&position, |(p, _)| *p) {
            Ok(index) => self.arguments[index].1 = value,
            Err(index) => self.arguments.insert(index, (position, value)),
        }
        self
    }

    /// The wire message for this call.
    pub fn to_proto(&self) -> ProcedureCall {
        ProcedureCall {
            service: self.service.clone(),
            procedure: self.procedure.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|(position, value)| Argument {
                    position: *position,
                    value: value.clone(),
                })
                .collect(),
            ..ProcedureCall::default()
        }
    }
}

impl From<ProcedureCall> for CallDescriptor {
    fn from(call: ProcedureCall) -> Self {
        let mut arguments: Vec<(u32, Bytes)> = call
            .arguments
            .into_iter()
            .map(|arg| (arg.position, arg.value))
            .collect();
        arguments.sort_by_key(|(position, _)| *position);
        Self {
            service: call.service,
            procedure: call.procedure,
            arguments,
        }
    }
}

impl fmt::Debug for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("service", &self.service)
            .field("procedure", &self.procedure)
            .field(
                "arguments",
                &format_args!(
                    "[{}]",
                    self.arguments
                        .iter()
                        .map(|(p, v)| format!("{p}:{}B", v.len()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
            .finish()
    }
}

impl fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.procedure)
    }
}

/// A call is itself a value: stream registration takes one as its argument.
impl Encode for CallDescriptor {
    fn encode(&self, buf: &mut BytesMut) {
        self.to_proto().encode_raw(buf);
    }
}

impl Decode for CallDescriptor {
    fn decode(data: &[u8]) -> codec::Result<Self> {
        ProcedureCall::decode(data)
            .map(Self::from)
            .map_err(|err| DecodeError::container("procedure call", err))
    }
}

/// Incremental construction of a [`CallDescriptor`].
#[derive(Debug)]
pub struct CallBuilder {
    call: CallDescriptor,
    next_position: u32,
}

impl CallBuilder {
    /// Append an argument, encoding it.
    pub fn arg<T: Encode + ?Sized>(self, value: &T) -> Self {
        self.raw_arg(codec::encode(value))
    }

    /// Append an already encoded argument.
    pub fn raw_arg(mut self, value: impl Into<Bytes>) -> Self {
        self.call.arguments.push((self.next_position, value.into()));
        self.next_position += 1;
        self
    }

    /// Leave the next position out so the server applies its default.
    pub fn skip(mut self) -> Self {
        self.next_position += 1;
        self
    }

    pub fn build(self) -> CallDescriptor {
        self.call
    }
}
