use std::io::{self, Read};

use bytes::Bytes;
use cid::Cid;

use crate::error::{CarReadError, CarReadResult};
use crate::header::CarHeader;
use crate::varint::{MAX_UVARINT_LEN_64, read_uvarint_slice, read_uvarint64, uvarint_len};

/// Upper bound on a CID prefix (version + codec + mh code + mh len + 64-byte digest).
const MAX_CID_LEN: usize = 1 + 3 * MAX_UVARINT_LEN_64 + 64;

/// Upper bound on the header body; anything larger is treated as garbage.
const MAX_HEADER_LEN: u64 = 32 << 20;

/// One decoded section of the archive.
#[derive(Debug, Clone)]
pub struct CarSection {
    pub cid: Cid,
    /// Offset of the section's length prefix, relative to the end of the header.
    pub position: u64,
    pub data: Bytes,
}

/// Forward-only reader over CAR sections.
///
/// Positions are tracked relative to the first byte after the header, so the
/// first section is always at position 0.
pub struct CarBlockReader<R: Read> {
    reader: io::BufReader<R>,
    position: u64,
    cid_buf: Vec<u8>,
}

impl<R: Read> CarBlockReader<R> {
    pub fn with_capacity(inner: R, io_buf_bytes: usize) -> Self {
        Self {
            reader: io::BufReader::with_capacity(io_buf_bytes, inner),
            position: 0,
            cid_buf: Vec::with_capacity(MAX_CID_LEN),
        }
    }

    /// Reads the framed header. Returns it with the number of bytes it occupies.
    pub fn read_header(&mut self) -> CarReadResult<(CarHeader, u64)> {
        let header_len = read_uvarint64(&mut self.reader)?
            .ok_or_else(|| CarReadError::UnexpectedEof("empty archive".to_string()))?;
        if header_len == 0 || header_len > MAX_HEADER_LEN {
            return Err(CarReadError::Header(format!(
                "implausible header length {header_len}"
            )));
        }
        let mut tmp = vec![0u8; header_len as usize];
        self.reader.read_exact(&mut tmp).map_err(eof_as)?;
        let header = CarHeader::decode(&tmp)?;
        self.position = 0;
        Ok((header, uvarint_len(header_len) as u64 + header_len))
    }

    pub fn skip_header(&mut self) -> CarReadResult<()> {
        self.read_header().map(|_| ())
    }

    /// Reads the next section's CID and position, skipping its payload.
    ///
    /// - Ok(Some(..)) => section read
    /// - Ok(None)     => clean EOF
    pub fn next_block_position(&mut self) -> CarReadResult<Option<(Cid, u64)>> {
        let Some((cid, position, data_len)) = self.read_section_prefix()? else {
            return Ok(None);
        };
        let skipped = io::copy(&mut (&mut self.reader).take(data_len), &mut io::sink())?;
        if skipped != data_len {
            return Err(CarReadError::UnexpectedEof(format!(
                "block {cid} truncated at position {position}"
            )));
        }
        Ok(Some((cid, position)))
    }

    /// Reads the next section including its payload.
    pub fn next_section(&mut self) -> CarReadResult<Option<CarSection>> {
        let Some((cid, position, data_len)) = self.read_section_prefix()? else {
            return Ok(None);
        };
        // grows with what is actually read, never with the declared length
        let mut data = Vec::new();
        (&mut self.reader).take(data_len).read_to_end(&mut data)?;
        if data.len() as u64 != data_len {
            return Err(CarReadError::UnexpectedEof(format!(
                "block {cid} truncated at position {position}"
            )));
        }
        Ok(Some(CarSection {
            cid,
            position,
            data: Bytes::from(data),
        }))
    }

    /// Reads `uvarint(len) cid` and advances the position past the whole
    /// section. Returns the CID, the section position and the payload length
    /// still to be consumed.
    fn read_section_prefix(&mut self) -> CarReadResult<Option<(Cid, u64, u64)>> {
        let position = self.position;
        let entry_len = match read_uvarint64(&mut self.reader)? {
            Some(v) => v,
            None => return Ok(None),
        };

        if entry_len == 0 {
            return Err(CarReadError::InvalidEntryLen(format!(
                "entry len 0 at position {position}"
            )));
        }

        self.cid_buf.clear();
        self.read_cid_prefix(entry_len)?;
        let cid_len = self.cid_buf.len() as u64;
        let cid = Cid::try_from(self.cid_buf.as_slice())?;

        self.position = position
            .checked_add(uvarint_len(entry_len) as u64)
            .and_then(|p| p.checked_add(entry_len))
            .ok_or_else(|| {
                CarReadError::InvalidEntryLen(format!(
                    "entry len {entry_len} at position {position} overflows the archive offset"
                ))
            })?;
        Ok(Some((cid, position, entry_len - cid_len)))
    }

    /// Pulls exactly the CID bytes into `cid_buf`, never more than `entry_len`.
    fn read_cid_prefix(&mut self, entry_len: u64) -> CarReadResult<()> {
        let version = self.read_cid_byte()?;
        let digest_len = match version {
            // CIDv0: bare sha2-256 multihash
            0x12 => {
                if self.read_cid_byte()? != 0x20 {
                    return Err(CarReadError::Cid("malformed CIDv0 prefix".to_string()));
                }
                32
            }
            0x01 => {
                self.read_cid_varint()?; // codec
                self.read_cid_varint()?; // multihash code
                self.read_cid_varint()? // digest length
            }
            other => {
                return Err(CarReadError::Cid(format!(
                    "unsupported CID version byte {other:#04x}"
                )));
            }
        };

        let cid_len = (self.cid_buf.len() as u64).saturating_add(digest_len);
        if cid_len > entry_len || cid_len > MAX_CID_LEN as u64 {
            return Err(CarReadError::InvalidEntryLen(format!(
                "entry of {entry_len} bytes cannot hold a {cid_len} byte cid"
            )));
        }

        let have = self.cid_buf.len();
        self.cid_buf.resize(cid_len as usize, 0);
        self.reader
            .read_exact(&mut self.cid_buf[have..])
            .map_err(eof_as)?;
        Ok(())
    }

    fn read_cid_byte(&mut self) -> CarReadResult<u8> {
        let mut b = [0u8; 1];
        self.reader.read_exact(&mut b).map_err(eof_as)?;
        self.cid_buf.push(b[0]);
        Ok(b[0])
    }

    fn read_cid_varint(&mut self) -> CarReadResult<u64> {
        let start = self.cid_buf.len();
        loop {
            let b = self.read_cid_byte()?;
            if b < 0x80 {
                break;
            }
            if self.cid_buf.len() - start >= MAX_UVARINT_LEN_64 {
                return Err(CarReadError::VarintOverflow("cid varint too long".to_string()));
            }
        }
        read_uvarint_slice(&self.cid_buf[start..])
            .map(|(v, _)| v)
            .ok_or_else(|| CarReadError::VarintOverflow("cid varint overflow".to_string()))
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }
}

fn eof_as(e: io::Error) -> CarReadError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CarReadError::UnexpectedEof(e.to_string())
    } else {
        CarReadError::Io(e)
    }
}
