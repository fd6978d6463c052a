//! Prefix-scoped key spaces.

use std::fmt;

use crate::error::{TupleError, TupleResult};
use crate::tuple::Tuple;

/// A byte prefix that scopes a family of keys.
///
/// Keys inside a subspace are `prefix ++ pack(tuple)`. Because packed tuples
/// never start with `0x00` or `0xFF`, `[prefix ++ 0x00, prefix ++ 0xFF)`
/// covers every key of the subspace and nothing else.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Subspace {
    prefix: Vec<u8>,
}

impl Subspace {
    /// Creates a subspace from a raw prefix.
    pub fn from_bytes(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the raw prefix.
    pub fn key(&self) -> &[u8] {
        &self.prefix
    }

    /// Returns the nested subspace `prefix ++ pack((index,))`.
    pub fn subspace(&self, index: u64) -> Subspace {
        self.nested(&Tuple::from(index))
    }

    /// Returns the nested subspace `prefix ++ pack(tuple)`.
    pub fn nested(&self, tuple: &Tuple) -> Subspace {
        Subspace {
            prefix: self.pack(tuple),
        }
    }

    /// Encodes `tuple` into a key of this subspace.
    pub fn pack(&self, tuple: &Tuple) -> Vec<u8> {
        let mut key = self.prefix.clone();
        tuple.pack_into(&mut key);
        key
    }

    /// Decodes a key of this subspace back into its tuple.
    pub fn unpack(&self, key: &[u8]) -> TupleResult<Tuple> {
        let rest = key
            .strip_prefix(self.prefix.as_slice())
            .ok_or(TupleError::NotInSubspace)?;
        Tuple::unpack(rest)
    }

    /// Returns `true` if `key` starts with this subspace's prefix.
    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.prefix)
    }

    /// Returns the half-open key range `(begin, end)` covering the subspace.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let mut begin = self.prefix.clone();
        begin.push(0x00);
        let mut end = self.prefix.clone();
        end.push(0xFF);
        (begin, end)
    }
}

impl fmt::Debug for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subspace(")?;
        for b in &self.prefix {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_within_subspace() {
        let root = Subspace::from_bytes(vec![0x15, 0x07]);
        let flags = root.subspace(1);
        let key = flags.pack(&Tuple::from(42u64));

        assert!(root.contains(&key));
        assert_eq!(flags.unpack(&key).unwrap(), Tuple::from(42u64));
        assert_eq!(
            root.subspace(0).unpack(&key),
            Err(TupleError::NotInSubspace)
        );
    }

    #[test]
    fn test_range_covers_children_only() {
        let root = Subspace::from_bytes(vec![0x15, 0x07]);
        let (begin, end) = root.subspace(2).range();
        let inside = root.subspace(2).pack(&Tuple::from(u64::MAX));
        let sibling = root.subspace(3).pack(&Tuple::from(0u64));

        assert!(begin <= inside && inside < end);
        assert!(sibling >= end);
    }
}
