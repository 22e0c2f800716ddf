//! Index codecs mapping a block's CID to its relative section offset.
//!
//! Every codec is identified by a multicodec-range id written as the first
//! varint of a sidecar index file. `IndexCodec::empty_index` is the registry
//! used to dispatch restoration.

use std::fmt;
use std::io::Write;

use car_reader::Cid;

use crate::error::{CarbsError, Result};
use crate::record::{NOT_FOUND, Record};

mod hashed;
mod payload;
mod single_sorted;
mod sorted;

pub use hashed::{DEFAULT_LOAD_FACTOR, HashedIndex};
pub use single_sorted::SingleSortedIndex;
pub use sorted::{DigestTable, SortedIndex};

/// Codec identifier, the leading varint of an index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum IndexCodec {
    Hashed = 0x300000,
    Sorted = 0x300001,
    SingleSorted = 0x300002,
}

/// Known index formats.
pub const INDEX_CODECS: [IndexCodec; 3] = [
    IndexCodec::Hashed,
    IndexCodec::Sorted,
    IndexCodec::SingleSorted,
];

impl IndexCodec {
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        INDEX_CODECS.into_iter().find(|c| c.as_u64() == value)
    }

    /// Constructs the empty index a payload of this codec decodes into.
    pub fn empty_index(self) -> Index {
        match self {
            IndexCodec::Hashed => Index::Hashed(HashedIndex::default()),
            IndexCodec::Sorted => Index::Sorted(SortedIndex::default()),
            IndexCodec::SingleSorted => Index::SingleSorted(SingleSortedIndex::default()),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            IndexCodec::Hashed => "hashed",
            IndexCodec::Sorted => "sorted",
            IndexCodec::SingleSorted => "single-sorted",
        }
    }
}

impl TryFrom<u64> for IndexCodec {
    type Error = CarbsError;

    fn try_from(value: u64) -> Result<Self> {
        Self::from_u64(value).ok_or(CarbsError::UnknownCodec(value))
    }
}

impl fmt::Display for IndexCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#x})", self.name(), self.as_u64())
    }
}

/// A loaded index of one of the built-in codecs.
#[derive(Debug, Clone)]
pub enum Index {
    Hashed(HashedIndex),
    Sorted(SortedIndex),
    SingleSorted(SingleSortedIndex),
}

impl Index {
    /// Builds an index of `codec` over `records`. Later duplicates of a CID
    /// are ignored.
    pub fn build(codec: IndexCodec, records: &[Record]) -> Result<Self> {
        let mut idx = codec.empty_index();
        idx.load(records)?;
        Ok(idx)
    }

    #[inline]
    pub fn codec(&self) -> IndexCodec {
        match self {
            Index::Hashed(_) => IndexCodec::Hashed,
            Index::Sorted(_) => IndexCodec::Sorted,
            Index::SingleSorted(_) => IndexCodec::SingleSorted,
        }
    }

    /// Replaces the contents with `records`.
    pub fn load(&mut self, records: &[Record]) -> Result<()> {
        match self {
            Index::Hashed(i) => i.load(records),
            Index::Sorted(i) => i.load(records),
            Index::SingleSorted(i) => i.load(records),
        }
    }

    /// Relative offset of `cid`'s section, or [`NOT_FOUND`].
    #[inline]
    pub fn get(&self, cid: &Cid) -> u64 {
        match self {
            Index::Hashed(i) => i.get(cid),
            Index::Sorted(i) => i.get(cid),
            Index::SingleSorted(i) => i.get(cid),
        }
    }

    #[inline]
    pub fn lookup(&self, cid: &Cid) -> Option<u64> {
        match self.get(cid) {
            NOT_FOUND => None,
            offset => Some(offset),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Index::Hashed(i) => i.len(),
            Index::Sorted(i) => i.len(),
            Index::SingleSorted(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Codec payload only, without the leading codec id.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Index::Hashed(i) => i.encode_into(&mut out),
            Index::Sorted(i) => i.encode_into(&mut out),
            Index::SingleSorted(i) => i.encode_into(&mut out),
        }
        out
    }

    pub fn marshal<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Replaces the contents with a payload produced by [`Index::marshal`]
    /// for the same codec. The whole slice must be consumed.
    pub fn unmarshal(&mut self, payload: &[u8]) -> Result<()> {
        match self {
            Index::Hashed(i) => i.decode(payload),
            Index::Sorted(i) => i.decode(payload),
            Index::SingleSorted(i) => i.decode(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_ids_are_stable() {
        assert_eq!(IndexCodec::Hashed.as_u64(), 0x300000);
        assert_eq!(IndexCodec::Sorted.as_u64(), 0x300001);
        assert_eq!(IndexCodec::SingleSorted.as_u64(), 0x300002);
    }

    #[test]
    fn registry_dispatches_every_codec() {
        for codec in INDEX_CODECS {
            assert_eq!(IndexCodec::try_from(codec.as_u64()).unwrap(), codec);
            assert_eq!(codec.empty_index().codec(), codec);
        }
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert!(matches!(
            IndexCodec::try_from(0x0400),
            Err(CarbsError::UnknownCodec(0x0400))
        ));
    }
}
