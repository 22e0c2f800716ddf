use std::cmp::Ordering;

use car_reader::Cid;
use car_reader::varint::put_uvarint;
use tracing::debug;

use super::payload::{PayloadReader, put_len};
use crate::error::{CarbsError, Result};
use crate::record::{NOT_FOUND, Record, digest_of};

/// Digests of one fixed width, sorted ascending, stored back to back.
///
/// `digests[i * width..(i + 1) * width]` pairs with `offsets[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestTable {
    width: usize,
    digests: Vec<u8>,
    offsets: Vec<u64>,
}

impl DigestTable {
    pub(crate) fn empty(width: usize) -> Self {
        Self {
            width,
            digests: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Sorts `records` (all of digest width `width`) and keeps the first
    /// occurrence of each CID.
    ///
    /// Only digests are stored, so two different CIDs over one digest cannot
    /// both be indexed: that fails with `SharedDigest`.
    pub(crate) fn build(width: usize, records: &mut [&Record]) -> Result<Self> {
        // stable: equal digests stay in input order, so the first one survives
        records.sort_by(|a, b| a.digest().cmp(b.digest()));

        let mut table = Self {
            width,
            digests: Vec::with_capacity(records.len() * width),
            offsets: Vec::with_capacity(records.len()),
        };
        let mut last: Option<&Record> = None;
        for &r in records.iter() {
            let d = r.digest();
            debug_assert_eq!(d.len(), width);
            if let Some(prev) = last.filter(|prev| prev.digest() == d) {
                if prev.cid != r.cid {
                    return Err(CarbsError::SharedDigest {
                        first: prev.cid,
                        second: r.cid,
                    });
                }
                continue;
            }
            table.digests.extend_from_slice(d);
            table.offsets.push(r.offset);
            last = Some(r);
        }
        Ok(table)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[inline]
    fn digest_at(&self, i: usize) -> &[u8] {
        &self.digests[i * self.width..(i + 1) * self.width]
    }

    /// Binary search for an exact digest match.
    #[inline]
    pub fn find(&self, digest: &[u8]) -> u64 {
        if digest.len() != self.width {
            return NOT_FOUND;
        }
        let (mut lo, mut hi) = (0usize, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.digest_at(mid).cmp(digest) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return self.offsets[mid],
            }
        }
        NOT_FOUND
    }

    /// `uvarint(width) uvarint(count)` then `digest uvarint(offset)` per entry.
    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        put_len(out, self.width);
        put_len(out, self.len());
        for (i, &offset) in self.offsets.iter().enumerate() {
            out.extend_from_slice(self.digest_at(i));
            put_uvarint(out, offset);
        }
    }

    pub(crate) fn decode_from(rd: &mut PayloadReader<'_>) -> Result<Self> {
        let width = rd.uvarint("digest width")? as usize;
        if width > 64 {
            return Err(CarbsError::corrupt(format!("digest width {width} exceeds 64")));
        }
        let count = rd.count("record count", width + 1)?;

        let mut table = Self {
            width,
            digests: Vec::with_capacity(count * width),
            offsets: Vec::with_capacity(count),
        };
        for i in 0..count {
            let d = rd.bytes(width, "digest")?;
            if i > 0 && table.digest_at(i - 1) >= d {
                return Err(CarbsError::corrupt(format!(
                    "digests out of order at entry {i}"
                )));
            }
            table.digests.extend_from_slice(d);
            let offset = rd.uvarint("offset")?;
            if offset == NOT_FOUND {
                return Err(CarbsError::corrupt("offset equals the not-found sentinel"));
            }
            table.offsets.push(offset);
        }
        Ok(table)
    }
}

/// Sorted digest tables, one per digest width, ascending by width.
#[derive(Debug, Clone, Default)]
pub struct SortedIndex {
    groups: Vec<DigestTable>,
}

impl SortedIndex {
    pub fn load(&mut self, records: &[Record]) -> Result<()> {
        let mut by_width: Vec<(usize, Vec<&Record>)> = Vec::new();
        for r in records {
            let w = r.digest().len();
            match by_width.binary_search_by_key(&w, |(width, _)| *width) {
                Ok(i) => by_width[i].1.push(r),
                Err(i) => by_width.insert(i, (w, vec![r])),
            }
        }

        self.groups = by_width
            .into_iter()
            .map(|(w, mut recs)| DigestTable::build(w, &mut recs))
            .collect::<Result<_>>()?;

        debug!(
            records = self.len(),
            groups = self.groups.len(),
            "sorted index loaded"
        );
        Ok(())
    }

    #[inline]
    pub fn get(&self, cid: &Cid) -> u64 {
        let digest = digest_of(cid);
        self.groups
            .iter()
            .find(|g| g.width() == digest.len())
            .map_or(NOT_FOUND, |g| g.find(digest))
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(DigestTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(DigestTable::is_empty)
    }

    pub fn groups(&self) -> &[DigestTable] {
        &self.groups
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        put_len(out, self.groups.len());
        for g in &self.groups {
            g.encode_into(out);
        }
    }

    pub fn decode(&mut self, payload: &[u8]) -> Result<()> {
        let mut rd = PayloadReader::new(payload);
        // smallest group: 1-byte width, 1-byte count
        let n = rd.count("group count", 2)?;

        let mut groups: Vec<DigestTable> = Vec::with_capacity(n);
        for _ in 0..n {
            let g = DigestTable::decode_from(&mut rd)?;
            if let Some(prev) = groups.last() {
                if prev.width() >= g.width() {
                    return Err(CarbsError::corrupt(format!(
                        "group width {} follows {}",
                        g.width(),
                        prev.width()
                    )));
                }
            }
            groups.push(g);
        }
        rd.finish()?;

        self.groups = groups;
        debug!(
            records = self.len(),
            groups = self.groups.len(),
            "sorted index decoded"
        );
        Ok(())
    }
}
