use std::io::Write;

use cid::Cid;

use crate::error::CarReadResult;
use crate::header::CarHeader;
use crate::varint::write_uvarint;

/// Writes a CAR v1 archive: the framed header, then one section per block.
pub struct CarWriter<W> {
    w: W,
    position: u64,
}

impl<W: Write> CarWriter<W> {
    /// Writes the header immediately.
    pub fn new(mut w: W, header: &CarHeader) -> CarReadResult<Self> {
        w.write_all(&header.to_framed_bytes()?)?;
        Ok(Self { w, position: 0 })
    }

    /// Appends `uvarint(len) cid data` and returns the section's position
    /// relative to the end of the header.
    #[inline]
    pub fn write_block(&mut self, cid: &Cid, data: &[u8]) -> CarReadResult<u64> {
        let cid_bytes = cid.to_bytes();
        let len = (cid_bytes.len() + data.len()) as u64;

        let at = self.position;
        let prefix = write_uvarint(&mut self.w, len)?;
        self.w.write_all(&cid_bytes)?;
        self.w.write_all(data)?;
        self.position += prefix as u64 + len;
        Ok(at)
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn flush(&mut self) -> CarReadResult<()> {
        self.w.flush()?;
        Ok(())
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.w
    }
}
