//! Cursor helpers shared by the codec (de)serializers.

use car_reader::varint::{put_uvarint, read_uvarint_slice};

use crate::error::{CarbsError, Result};

pub(crate) struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub(crate) fn uvarint(&mut self, what: &str) -> Result<u64> {
        let (v, used) = read_uvarint_slice(&self.buf[self.pos..])
            .ok_or_else(|| CarbsError::corrupt(format!("bad varint for {what} at byte {}", self.pos)))?;
        self.pos += used;
        Ok(v)
    }

    /// Reads a count and rejects it when even `min_item_len` bytes per item
    /// could not fit in what is left.
    #[inline]
    pub(crate) fn count(&mut self, what: &str, min_item_len: usize) -> Result<usize> {
        let n = self.uvarint(what)?;
        let need = n.saturating_mul(min_item_len.max(1) as u64);
        if need > self.remaining() as u64 {
            return Err(CarbsError::corrupt(format!(
                "{what} of {n} does not fit in {} remaining bytes",
                self.remaining()
            )));
        }
        Ok(n as usize)
    }

    #[inline]
    pub(crate) fn bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CarbsError::corrupt(format!(
                "{what} needs {n} bytes, {} left",
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(CarbsError::corrupt(format!(
                "{} trailing bytes after index payload",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn put_len(out: &mut Vec<u8>, n: usize) {
    put_uvarint(out, n as u64);
}
