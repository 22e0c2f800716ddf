use std::convert::Infallible;

use cid::Cid;
use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::error::{CarReadError, CarReadResult};
use crate::varint::{put_uvarint, read_uvarint_slice};

/// DAG-CBOR tag for CID links.
const CID_TAG: u64 = 42;

pub const CAR_VERSION: u64 = 1;

/// The leading metadata block of a CAR v1 archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarHeader {
    pub version: u64,
    pub roots: Vec<Cid>,
}

impl CarHeader {
    pub fn new(roots: Vec<Cid>) -> Self {
        Self {
            version: CAR_VERSION,
            roots,
        }
    }

    /// Decodes the CBOR header body (without its length prefix).
    pub fn decode(buf: &[u8]) -> CarReadResult<Self> {
        let mut d = Decoder::new(buf);
        let entries = d
            .map()?
            .ok_or_else(|| CarReadError::Header("indefinite-length header map".to_string()))?;

        let mut roots = None;
        let mut version = None;
        for _ in 0..entries {
            match d.str()? {
                "roots" => roots = Some(decode_roots(&mut d)?),
                "version" => version = Some(d.u64()?),
                _ => d.skip()?,
            }
        }

        let version =
            version.ok_or_else(|| CarReadError::Header("missing version".to_string()))?;
        if version != CAR_VERSION {
            return Err(CarReadError::InvalidData(format!(
                "unsupported CAR version {version}"
            )));
        }
        let roots = roots.ok_or_else(|| CarReadError::Header("missing roots".to_string()))?;

        Ok(Self { version, roots })
    }

    /// Encodes the CBOR header body (without its length prefix).
    pub fn encode(&self) -> CarReadResult<Vec<u8>> {
        self.encode_cbor()
            .map_err(|e| CarReadError::Header(e.to_string()))
    }

    fn encode_cbor(&self) -> Result<Vec<u8>, minicbor::encode::Error<Infallible>> {
        let mut e = Encoder::new(Vec::new());
        e.map(2)?.str("roots")?.array(self.roots.len() as u64)?;
        for root in &self.roots {
            let mut link = Vec::with_capacity(root.encoded_len() + 1);
            // multibase identity prefix
            link.push(0x00);
            link.extend_from_slice(&root.to_bytes());
            e.tag(Tag::new(CID_TAG))?.bytes(&link)?;
        }
        e.str("version")?.u64(self.version)?;
        Ok(e.into_writer())
    }

    /// Encodes `uvarint(len) header`, the exact bytes that open an archive.
    pub fn to_framed_bytes(&self) -> CarReadResult<Vec<u8>> {
        let body = self.encode()?;
        let mut out = Vec::with_capacity(body.len() + 4);
        put_uvarint(&mut out, body.len() as u64);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Reads the framed header from the start of an in-memory archive.
    /// Returns the header and the number of bytes it occupies.
    pub fn read_framed(buf: &[u8]) -> CarReadResult<(Self, u64)> {
        let (len, used) = read_uvarint_slice(buf)
            .ok_or_else(|| CarReadError::Header("bad header length".to_string()))?;
        let end = used
            .checked_add(len as usize)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| CarReadError::UnexpectedEof("header truncated".to_string()))?;
        let header = Self::decode(&buf[used..end])?;
        Ok((header, end as u64))
    }
}

fn decode_roots(d: &mut Decoder<'_>) -> CarReadResult<Vec<Cid>> {
    let n = d
        .array()?
        .ok_or_else(|| CarReadError::Header("indefinite-length roots".to_string()))?;

    let mut roots = Vec::with_capacity(n.min(64) as usize);
    for _ in 0..n {
        if d.datatype()? == Type::Tag {
            let tag = d.tag()?;
            if tag.as_u64() != CID_TAG {
                return Err(CarReadError::Header(format!(
                    "unexpected tag {} on root",
                    tag.as_u64()
                )));
            }
        }
        let bytes = d.bytes()?;
        match bytes.split_first() {
            Some((0x00, raw)) => roots.push(Cid::try_from(raw)?),
            _ => return Err(CarReadError::Cid("root link missing identity prefix".to_string())),
        }
    }
    Ok(roots)
}
