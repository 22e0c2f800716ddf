use car_reader::Cid;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

/// Returned by index lookups for CIDs that are not indexed. Never a valid
/// position: offset 0 is the first block, `u64::MAX` cannot be reached.
pub const NOT_FOUND: u64 = u64::MAX;

/// A block's CID paired with the offset of its section, relative to the end
/// of the archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Record {
    pub cid: Cid,
    pub offset: u64,
}

impl Record {
    #[inline]
    pub fn new(cid: Cid, offset: u64) -> Self {
        Self { cid, offset }
    }

    #[inline]
    pub fn digest(&self) -> &[u8] {
        self.cid.hash().digest()
    }
}

/// Digest bytes of a CID, the key every index codec works on.
#[inline]
pub fn digest_of(cid: &Cid) -> &[u8] {
    cid.hash().digest()
}

/// Drops records whose CID was already seen, keeping the first occurrence in
/// input order.
pub fn first_occurrences(records: &[Record]) -> Vec<Record> {
    let mut seen = FxHashSet::with_capacity_and_hasher(records.len(), FxBuildHasher);
    records
        .iter()
        .filter(|r| seen.insert(r.cid))
        .copied()
        .collect()
}

/// First pair of different CIDs that carry the same digest bytes, such as a
/// raw and a dag-cbor CID over one block. Digest-keyed codecs cannot hold both.
pub fn shared_digest(records: &[Record]) -> Option<(Cid, Cid)> {
    let mut by_digest: FxHashMap<&[u8], Cid> =
        FxHashMap::with_capacity_and_hasher(records.len(), FxBuildHasher);
    for r in records {
        let first = *by_digest.entry(r.digest()).or_insert(r.cid);
        if first != r.cid {
            return Some((first, r.cid));
        }
    }
    None
}

/// `true` when every record's digest has the same length.
pub fn uniform_digest_len(records: &[Record]) -> bool {
    match records.split_first() {
        None => true,
        Some((first, rest)) => {
            let len = first.digest().len();
            rest.iter().all(|r| r.digest().len() == len)
        }
    }
}
