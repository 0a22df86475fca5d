use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use bytes::{Bytes, BytesMut};
use krpc_schema::{Dictionary, DictionaryEntry, List, Message, Set, Tuple};

use super::{encode, Decode, DecodeError, Encode, Result};

fn decode_items<T: Decode>(items: Vec<Bytes>) -> Result<Vec<T>> {
    items.iter().map(|item| T::decode(item)).collect()
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, buf: &mut BytesMut) {
        List {
            items: self.iter().map(encode).collect(),
        }
        .encode_raw(buf);
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut BytesMut) {
        self.as_slice().encode(buf);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(data: &[u8]) -> Result<Self> {
        let list = List::decode(data).map_err(|err| DecodeError::container("list", err))?;
        decode_items(list.items)
    }
}

fn encode_set<'a, T: Encode + 'a>(items: impl Iterator<Item = &'a T>, buf: &mut BytesMut) {
    Set {
        items: items.map(encode).collect(),
    }
    .encode_raw(buf);
}

fn decode_set<T: Decode>(data: &[u8]) -> Result<Vec<T>> {
    let set = Set::decode(data).map_err(|err| DecodeError::container("set", err))?;
    decode_items(set.items)
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode(&self, buf: &mut BytesMut) {
        encode_set(self.iter(), buf);
    }
}

impl<T: Decode + Ord> Decode for BTreeSet<T> {
    fn decode(data: &[u8]) -> Result<Self> {
        decode_set(data).map(|items| items.into_iter().collect())
    }
}

impl<T: Encode, S> Encode for HashSet<T, S> {
    fn encode(&self, buf: &mut BytesMut) {
        encode_set(self.iter(), buf);
    }
}

impl<T: Decode + Eq + Hash> Decode for HashSet<T> {
    fn decode(data: &[u8]) -> Result<Self> {
        decode_set(data).map(|items| items.into_iter().collect())
    }
}

fn encode_entries<'a, K: Encode + 'a, V: Encode + 'a>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    buf: &mut BytesMut,
) {
    Dictionary {
        entries: entries
            .map(|(key, value)| DictionaryEntry {
                key: encode(key),
                value: encode(value),
            })
            .collect(),
    }
    .encode_raw(buf);
}

fn decode_entries<K: Decode, V: Decode>(data: &[u8]) -> Result<Vec<(K, V)>> {
    let dict =
        Dictionary::decode(data).map_err(|err| DecodeError::container("dictionary", err))?;
    dict.entries
        .iter()
        .map(|entry| Ok((K::decode(&entry.key)?, V::decode(&entry.value)?)))
        .collect()
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, buf: &mut BytesMut) {
        encode_entries(self.iter(), buf);
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(data: &[u8]) -> Result<Self> {
        decode_entries(data).map(|entries| entries.into_iter().collect())
    }
}

impl<K: Encode, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode(&self, buf: &mut BytesMut) {
        encode_entries(self.iter(), buf);
    }
}

impl<K: Decode + Eq + Hash, V: Decode> Decode for HashMap<K, V> {
    fn decode(data: &[u8]) -> Result<Self> {
        decode_entries(data).map(|entries| entries.into_iter().collect())
    }
}

macro_rules! tuple_codec {
    ($len:expr => $($name:ident : $idx:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(&self, buf: &mut BytesMut) {
                Tuple {
                    items: vec![$(encode(&self.$idx)),+],
                }
                .encode_raw(buf);
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode(data: &[u8]) -> Result<Self> {
                let tuple =
                    Tuple::decode(data).map_err(|err| DecodeError::container("tuple", err))?;
                if tuple.items.len() != $len {
                    return Err(DecodeError::TupleArity {
                        expected: $len,
                        found: tuple.items.len(),
                    });
                }
                Ok(($($name::decode(&tuple.items[$idx])?,)+))
            }
        }
    };
}

tuple_codec!(1 => A: 0);
tuple_codec!(2 => A: 0, B: 1);
tuple_codec!(3 => A: 0, B: 1, C: 2);
tuple_codec!(4 => A: 0, B: 1, C: 2, D: 3);
tuple_codec!(5 => A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_codec!(6 => A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
