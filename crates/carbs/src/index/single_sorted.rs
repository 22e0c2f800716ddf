use car_reader::Cid;
use tracing::debug;

use super::payload::PayloadReader;
use super::sorted::DigestTable;
use crate::error::{CarbsError, Result};
use crate::record::{Record, digest_of};

/// One sorted digest table for archives whose digests all share a length.
#[derive(Debug, Clone, Default)]
pub struct SingleSortedIndex {
    table: DigestTable,
}

impl SingleSortedIndex {
    /// Fails with `MixedDigestLength` on the first record whose digest length
    /// differs from the first record's.
    pub fn load(&mut self, records: &[Record]) -> Result<()> {
        let Some(first) = records.first() else {
            self.table = DigestTable::empty(0);
            return Ok(());
        };

        let width = first.digest().len();
        if let Some(bad) = records.iter().find(|r| r.digest().len() != width) {
            return Err(CarbsError::MixedDigestLength {
                expected: width,
                found: bad.digest().len(),
            });
        }

        let mut refs: Vec<&Record> = records.iter().collect();
        self.table = DigestTable::build(width, &mut refs)?;

        debug!(
            records = self.table.len(),
            width, "single-sorted index loaded"
        );
        Ok(())
    }

    #[inline]
    pub fn get(&self, cid: &Cid) -> u64 {
        self.table.find(digest_of(cid))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.table.width()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        self.table.encode_into(out);
    }

    pub fn decode(&mut self, payload: &[u8]) -> Result<()> {
        let mut rd = PayloadReader::new(payload);
        let table = DigestTable::decode_from(&mut rd)?;
        rd.finish()?;

        debug!(
            records = table.len(),
            width = table.width(),
            "single-sorted index decoded"
        );
        self.table = table;
        Ok(())
    }
}
