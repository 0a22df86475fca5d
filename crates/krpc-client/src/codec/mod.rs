//! Value codec.
//!
//! Every value that crosses the wire, whether as a call argument, a call result
//! or a stream update, is an opaque byte string produced by [`Encode`] and
//! consumed by [`Decode`]. The mapping is fixed per type:
//!
//! | Rust type                          | Wire form                                  |
//! |------------------------------------|--------------------------------------------|
//! | `i32`, `i64`                       | zig-zag varint                             |
//! | `u32`, `u64`                       | varint                                     |
//! | `bool`                             | varint 0 or 1                              |
//! | `f32`, `f64`                       | little-endian fixed 4 / 8 bytes            |
//! | `String`, `&str`                   | varint length + UTF-8                      |
//! | `Bytes`                            | varint length + raw bytes                  |
//! | `Vec<T>`, sets, tuples             | container of independently encoded items   |
//! | maps                               | container of encoded key/value entries     |
//! | [`Object<T>`](crate::Object)       | varint id, 0 meaning no object             |
//! | `Option<Object<T>>`                | as `Object<T>`, `None` is id 0             |
//! | enums from [`remote_enum!`]        | `i32`, not range checked                   |
//!
//! Decoding is strict about layout (truncation, trailing bytes, bad UTF-8) and
//! free of side effects.

mod collections;
mod error;
mod scalar;

use bytes::{Bytes, BytesMut};

pub use error::{DecodeError, Result};

/// Types that can be written as a wire value.
pub trait Encode {
    /// Append this value's wire form to `buf`.
    fn encode(&self, buf: &mut BytesMut);
}

/// Types that can be read back from a complete wire value.
pub trait Decode: Sized {
    /// Decode a value occupying all of `data`.
    fn decode(data: &[u8]) -> Result<Self>;
}

/// Encode a value into a fresh byte string.
pub fn encode<T: Encode + ?Sized>(value: &T) -> Bytes {
    let mut buf = BytesMut::new();
    value.encode(&mut buf);
    buf.freeze()
}

/// Decode a value from a complete byte string.
pub fn decode<T: Decode>(data: &[u8]) -> Result<T> {
    T::decode(data)
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, buf: &mut BytesMut) {
        (**self).encode(buf);
    }
}

impl Encode for () {
    fn encode(&self, _buf: &mut BytesMut) {}
}

impl Decode for () {
    /// Procedures without a return value answer with an empty payload; anything
    /// else is ignored rather than rejected.
    fn decode(_data: &[u8]) -> Result<Self> {
        Ok(())
    }
}

/// A value kept in its wire form, for callers that encode or decode
/// themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Raw(pub Bytes);

impl Encode for Raw {
    fn encode(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&self.0);
    }
}

impl Decode for Raw {
    fn decode(data: &[u8]) -> Result<Self> {
        Ok(Self(Bytes::copy_from_slice(data)))
    }
}

/// Declare an enumeration received from the server.
///
/// The generated type is a newtype over `i32` with one associated constant per
/// known value. Values the client has never heard of decode without error and
/// report `None` from `name()`, so a server that grows a new variant does not
/// break older clients.
///
/// ```
/// krpc_client::remote_enum! {
///     /// Current game scene.
///     pub struct GameScene {
///         SPACE_CENTER = 0,
///         FLIGHT = 1,
///     }
/// }
///
/// let scene: GameScene = krpc_client::decode(&krpc_client::encode(&GameScene::FLIGHT)).unwrap();
/// assert_eq!(scene, GameScene::FLIGHT);
/// ```
#[macro_export]
macro_rules! remote_enum {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(pub i32);

        impl $name {
            $($(#[$vmeta])* pub const $variant: Self = Self($value);)*

            /// Name of a known value, `None` for values this client does not know.
            pub fn name(self) -> ::core::option::Option<&'static str> {
                match self.0 {
                    $(v if v == $value => ::core::option::Option::Some(stringify!($variant)),)*
                    _ => ::core::option::Option::None,
                }
            }

            /// Whether this is one of the declared values.
            pub fn is_known(self) -> bool {
                self.name().is_some()
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self.name() {
                    ::core::option::Option::Some(name) => {
                        write!(f, "{}::{}", stringify!($name), name)
                    }
                    ::core::option::Option::None => write!(f, "{}({})", stringify!($name), self.0),
                }
            }
        }

        impl $crate::codec::Encode for $name {
            fn encode(&self, buf: &mut $crate::bytes::BytesMut) {
                $crate::codec::Encode::encode(&self.0, buf);
            }
        }

        impl $crate::codec::Decode for $name {
            fn decode(data: &[u8]) -> $crate::codec::Result<Self> {
                <i32 as $crate::codec::Decode>::decode(data).map(Self)
            }
        }
    };
}
