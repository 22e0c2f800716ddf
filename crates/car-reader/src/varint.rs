//! Unsigned LEB128 varints as used by CAR framing and index files.

use std::io::{BufRead, Write};

use crate::error::{CarReadError, CarReadResult};

pub const MAX_UVARINT_LEN_64: usize = 10;

/// Reads uvarint from an in-memory slice, returning (value, bytes_used).
///
/// Returns `None` on truncation or when the value does not fit in 64 bits.
#[inline]
pub fn read_uvarint_slice(buf: &[u8]) -> Option<(u64, usize)> {
    let mut x = 0u64;
    let mut s = 0u32;

    for (i, &b) in buf.iter().take(MAX_UVARINT_LEN_64).enumerate() {
        if b < 0x80 {
            if i == MAX_UVARINT_LEN_64 - 1 && b > 1 {
                return None;
            }
            return Some((x | ((b as u64) << s), i + 1));
        }
        x |= ((b & 0x7f) as u64) << s;
        s += 7;
    }
    None
}

/// Reads a uvarint64 from a buffered reader.
///
/// - Ok(Some(v)) => value decoded
/// - Ok(None)    => clean EOF before the first byte
pub fn read_uvarint64<R: BufRead>(r: &mut R) -> CarReadResult<Option<u64>> {
    let mut x: u64 = 0;
    let mut shift: u32 = 0;
    let mut i: usize = 0;

    loop {
        let buf = r.fill_buf()?;
        if buf.is_empty() {
            if i != 0 {
                return Err(CarReadError::UnexpectedEof(
                    "EOF while reading uvarint".to_string(),
                ));
            }
            return Ok(None);
        }

        let mut consumed = 0usize;

        for &byte in buf {
            consumed += 1;
            i += 1;

            if byte < 0x80 {
                if i == MAX_UVARINT_LEN_64 && byte > 1 {
                    r.consume(consumed);
                    return Err(CarReadError::VarintOverflow("uvarint overflow".to_string()));
                }
                x |= (byte as u64) << shift;
                r.consume(consumed);
                return Ok(Some(x));
            }

            x |= ((byte & 0x7f) as u64) << shift;
            shift += 7;

            if i >= MAX_UVARINT_LEN_64 {
                r.consume(consumed);
                return Err(CarReadError::VarintOverflow("uvarint too long".to_string()));
            }
        }

        r.consume(consumed);
    }
}

/// Appends `v` to `out`, returning the number of bytes written.
#[inline]
pub fn put_uvarint(out: &mut Vec<u8>, mut v: u64) -> usize {
    let start = out.len();
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
    out.len() - start
}

#[inline]
pub fn write_uvarint<W: Write>(w: &mut W, mut v: u64) -> std::io::Result<usize> {
    let mut buf = [0u8; MAX_UVARINT_LEN_64];
    let mut n = 0;
    while v >= 0x80 {
        buf[n] = (v as u8) | 0x80;
        v >>= 7;
        n += 1;
    }
    buf[n] = v as u8;
    n += 1;
    w.write_all(&buf[..n])?;
    Ok(n)
}

#[inline]
pub fn uvarint_len(mut v: u64) -> usize {
    let mut n = 1;
    while v >= 0x80 {
        v >>= 7;
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn slice_and_stream_agree() {
        for v in [0u64, 1, 127, 128, 300, 0x300000, u64::MAX - 1, u64::MAX] {
            let mut buf = Vec::new();
            let n = put_uvarint(&mut buf, v);
            assert_eq!(n, uvarint_len(v));
            assert_eq!(read_uvarint_slice(&buf), Some((v, n)));

            let mut cur = Cursor::new(buf.clone());
            assert_eq!(read_uvarint64(&mut cur).unwrap(), Some(v));

            let mut out = Vec::new();
            write_uvarint(&mut out, v).unwrap();
            assert_eq!(out, buf);
        }
    }

    #[test]
    fn multi_byte_encoding_matches_leb128() {
        let mut buf = Vec::new();
        put_uvarint(&mut buf, 300);
        assert_eq!(buf, [0xac, 0x02]);
    }

    #[test]
    fn clean_eof_is_none() {
        let mut cur = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_uvarint64(&mut cur).unwrap(), None);
    }

    #[test]
    fn truncated_varint_is_error() {
        assert_eq!(read_uvarint_slice(&[0x80, 0x80]), None);
        let mut cur = Cursor::new(vec![0x80u8, 0x80]);
        assert!(matches!(
            read_uvarint64(&mut cur),
            Err(CarReadError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn overflow_is_rejected() {
        let too_big = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        assert_eq!(read_uvarint_slice(&too_big), None);
        let mut cur = Cursor::new(too_big.to_vec());
        assert!(matches!(
            read_uvarint64(&mut cur),
            Err(CarReadError::VarintOverflow(_))
        ));
    }
}
