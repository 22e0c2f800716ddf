use car_reader::Cid;
use car_reader::varint::put_uvarint;
use tracing::debug;

use super::payload::{PayloadReader, put_len};
use crate::error::{CarbsError, Result};
use crate::record::{NOT_FOUND, Record, digest_of};

pub const DEFAULT_LOAD_FACTOR: f64 = 0.8;

/// Separate-chaining hash table keyed by digest bytes.
///
/// Buckets keep entries in encounter order and compare full CIDs, so two
/// CIDs that share a digest but differ in codec never shadow each other.
#[derive(Debug, Clone)]
pub struct HashedIndex {
    load_factor: f64,
    buckets: Vec<Vec<Record>>,
    len: usize,
}

impl Default for HashedIndex {
    fn default() -> Self {
        Self::with_load_factor(DEFAULT_LOAD_FACTOR)
    }
}

impl HashedIndex {
    /// `load_factor` outside `(0, 1]` falls back to the default.
    pub fn with_load_factor(load_factor: f64) -> Self {
        let load_factor = if load_factor > 0.0 && load_factor <= 1.0 {
            load_factor
        } else {
            DEFAULT_LOAD_FACTOR
        };
        Self {
            load_factor,
            buckets: Vec::new(),
            len: 0,
        }
    }

    pub fn load(&mut self, records: &[Record]) -> Result<()> {
        let n = bucket_count(records.len(), self.load_factor);
        let mut buckets: Vec<Vec<Record>> = vec![Vec::new(); n];
        let mut len = 0;

        for r in records {
            let bucket = &mut buckets[bucket_of(r.digest(), n)];
            if bucket.iter().any(|e| e.cid == r.cid) {
                continue;
            }
            bucket.push(*r);
            len += 1;
        }

        debug!(
            records = len,
            buckets = n,
            longest_chain = buckets.iter().map(Vec::len).max().unwrap_or(0),
            "hashed index loaded"
        );
        self.buckets = buckets;
        self.len = len;
        Ok(())
    }

    #[inline]
    pub fn get(&self, cid: &Cid) -> u64 {
        if self.buckets.is_empty() {
            return NOT_FOUND;
        }
        self.buckets[bucket_of(digest_of(cid), self.buckets.len())]
            .iter()
            .find(|r| r.cid == *cid)
            .map_or(NOT_FOUND, |r| r.offset)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn bucket_len(&self) -> usize {
        self.buckets.len()
    }

    /// `uvarint(buckets)` then per bucket `uvarint(entries)` followed by
    /// `uvarint(cid_len) cid_bytes uvarint(offset)` per entry.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        put_len(out, self.buckets.len());
        for bucket in &self.buckets {
            put_len(out, bucket.len());
            for r in bucket {
                let cid = r.cid.to_bytes();
                put_len(out, cid.len());
                out.extend_from_slice(&cid);
                put_uvarint(out, r.offset);
            }
        }
    }

    pub fn decode(&mut self, payload: &[u8]) -> Result<()> {
        let mut rd = PayloadReader::new(payload);
        let n = rd.count("bucket count", 1)?;

        let mut buckets = Vec::with_capacity(n);
        let mut len = 0;
        for i in 0..n {
            // smallest entry: 1-byte cid length, 1-byte cid, 1-byte offset
            let entries = rd.count("bucket entries", 3)?;
            let mut bucket = Vec::with_capacity(entries);
            for _ in 0..entries {
                let cid_len = rd.count("cid length", 1)?;
                let cid = Cid::try_from(rd.bytes(cid_len, "cid")?)
                    .map_err(|e| CarbsError::corrupt(format!("bad cid in bucket {i}: {e}")))?;
                let offset = rd.uvarint("offset")?;
                if offset == NOT_FOUND {
                    return Err(CarbsError::corrupt("offset equals the not-found sentinel"));
                }
                if bucket_of(digest_of(&cid), n) != i {
                    return Err(CarbsError::corrupt(format!("{cid} stored in wrong bucket {i}")));
                }
                bucket.push(Record::new(cid, offset));
            }
            len += bucket.len();
            buckets.push(bucket);
        }
        rd.finish()?;

        debug!(records = len, buckets = n, "hashed index decoded");
        self.buckets = buckets;
        self.len = len;
        Ok(())
    }
}

fn bucket_count(records: usize, load_factor: f64) -> usize {
    ((records as f64 / load_factor).ceil() as usize)
        .max(1)
        .next_power_of_two()
}

#[inline]
fn bucket_of(digest: &[u8], buckets: usize) -> usize {
    (hash64(digest) % buckets as u64) as usize
}

/// Low 64 bits of murmur3 x64-128. Persisted layouts depend on this value.
#[inline]
fn hash64(digest: &[u8]) -> u64 {
    fastmurmur3::hash(digest) as u64
}
