use cid::Cid;

use crate::error::{CarReadError, CarReadResult};
use crate::varint::read_uvarint_slice;

/// Returns the length in bytes of the CID at the beginning of a CAR entry,
/// without decoding it into a `Cid`.
///
/// CIDv0 is a bare sha2-256 multihash (`0x12 0x20` + 32 bytes).
/// CIDv1 is `0x01 + codec(uvarint) + mh_code(uvarint) + mh_len(uvarint) + digest[mh_len]`.
#[inline]
pub fn cid_bytes_len(entry: &[u8]) -> CarReadResult<usize> {
    if entry.is_empty() {
        return Err(CarReadError::Cid("empty entry".to_string()));
    }

    if entry.len() >= 2 && entry[0] == 0x12 && entry[1] == 0x20 {
        if entry.len() < 34 {
            return Err(CarReadError::Cid("CIDv0 digest truncated".to_string()));
        }
        return Ok(34);
    }

    if entry[0] != 0x01 {
        return Err(CarReadError::Cid(format!(
            "unsupported CID version byte {:#04x}",
            entry[0]
        )));
    }

    let mut off = 1;

    let (_, used) = read_uvarint_slice(&entry[off..])
        .ok_or_else(|| CarReadError::Cid("truncated codec".to_string()))?;
    off += used;

    let (_, used) = read_uvarint_slice(&entry[off..])
        .ok_or_else(|| CarReadError::Cid("truncated mh_code".to_string()))?;
    off += used;

    let (mh_len, used) = read_uvarint_slice(&entry[off..])
        .ok_or_else(|| CarReadError::Cid("truncated mh_len".to_string()))?;
    off += used;

    let end = off
        .checked_add(mh_len as usize)
        .ok_or_else(|| CarReadError::Cid("multihash length overflow".to_string()))?;
    if entry.len() < end {
        return Err(CarReadError::Cid("multihash digest truncated".to_string()));
    }

    Ok(end)
}

/// Splits a section body (everything after the length prefix) into its CID
/// and block payload.
#[inline]
pub fn split_entry(entry: &[u8]) -> CarReadResult<(Cid, &[u8])> {
    let cid_len = cid_bytes_len(entry)?;
    let cid = Cid::try_from(&entry[..cid_len])?;
    Ok((cid, &entry[cid_len..]))
}

/// Decodes the section starting at the beginning of `buf`:
/// `uvarint(len) cid block`. Returns the CID, the payload and the total number
/// of bytes the section occupies.
pub fn decode_section(buf: &[u8]) -> CarReadResult<(Cid, &[u8], usize)> {
    let (entry_len, used) = read_uvarint_slice(buf)
        .ok_or_else(|| CarReadError::VarintOverflow("bad section length".to_string()))?;
    if entry_len == 0 {
        return Err(CarReadError::InvalidEntryLen("entry len 0".to_string()));
    }
    let end = used
        .checked_add(entry_len as usize)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            CarReadError::UnexpectedEof(format!(
                "section of {entry_len} bytes runs past end of archive"
            ))
        })?;

    let (cid, payload) = split_entry(&buf[used..end])?;
    Ok((cid, payload, end))
}
