//! References to server-side objects.
//!
//! A remote object is nothing more than a class name and a numeric id. The
//! client owns no resources on its behalf: dropping an [`Object`] does nothing,
//! and deleting the server-side state is an explicit procedure call.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use bytes::BytesMut;

use crate::codec::{Decode, Encode, Result};

/// Marker for a remote class.
///
/// The wrapper layer declares one zero-sized type per class:
///
/// ```
/// use krpc_client::{Object, ObjectType};
///
/// pub enum VesselClass {}
/// impl ObjectType for VesselClass {
///     const NAME: &'static str = "Vessel";
/// }
/// pub type Vessel = Object<VesselClass>;
///
/// assert_eq!(Vessel::from_id(3).to_string(), "Vessel<3>");
/// ```
pub trait ObjectType {
    /// Class name as the server reports it.
    const NAME: &'static str;
}

/// A `(type, id)` handle to server-side state. Id 0 is the null object.
pub struct Object<T: ObjectType> {
    id: u64,
    _class: PhantomData<fn() -> T>,
}

impl<T: ObjectType> Object<T> {
    /// The null reference.
    pub const NULL: Self = Self::from_id(0);

    pub const fn from_id(id: u64) -> Self {
        Self {
            id,
            _class: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        T::NAME
    }

    /// Whether this is the null reference.
    pub fn is_null(&self) -> bool {
        self.id == 0
    }
}

impl<T: ObjectType> Clone for Object<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ObjectType> Copy for Object<T> {}

impl<T: ObjectType> Default for Object<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T: ObjectType> PartialEq for Object<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ObjectType> Eq for Object<T> {}

impl<T: ObjectType> PartialOrd for Object<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ObjectType> Ord for Object<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T: ObjectType> Hash for Object<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        T::NAME.hash(state);
        self.id.hash(state);
    }
}

impl<T: ObjectType> fmt::Display for Object<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", T::NAME, self.id)
    }
}

impl<T: ObjectType> fmt::Debug for Object<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: ObjectType> Encode for Object<T> {
    fn encode(&self, buf: &mut BytesMut) {
        self.id.encode(buf);
    }
}

impl<T: ObjectType> Decode for Object<T> {
    fn decode(data: &[u8]) -> Result<Self> {
        u64::decode(data).map(Self::from_id)
    }
}

/// Nullable references. `None` travels as the null id; an empty payload is
/// also read as `None`.
impl<T: ObjectType> Encode for Option<Object<T>> {
    fn encode(&self, buf: &mut BytesMut) {
        self.unwrap_or(Object::NULL).encode(buf);
    }
}

impl<T: ObjectType> Decode for Option<Object<T>> {
    fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(None);
        }
        let object = Object::<T>::decode(data)?;
        Ok((!object.is_null()).then_some(object))
    }
}
