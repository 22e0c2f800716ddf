//! Sidecar index files: `uvarint(codec id) payload`, written and read whole.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use car_reader::varint::{read_uvarint_slice, write_uvarint};
use tracing::{debug, info};

use crate::error::{CarbsError, Result};
use crate::index::{Index, IndexCodec};

pub const INDEX_SUFFIX: &str = ".idx";

/// Sidecar path for the archive at `car_path`.
pub fn index_path(car_path: &Path) -> PathBuf {
    let mut p = OsString::from(car_path.as_os_str());
    p.push(INDEX_SUFFIX);
    PathBuf::from(p)
}

/// Writes `index` to the sidecar of `car_path`, replacing any previous file.
pub fn save(index: &Index, car_path: &Path) -> Result<()> {
    let path = index_path(car_path);
    let f = File::create(&path)?;
    let mut w = BufWriter::new(f);

    write_uvarint(&mut w, index.codec().as_u64())?;
    index.marshal(&mut w)?;
    w.flush()?;

    info!(
        path = %path.display(),
        codec = %index.codec(),
        records = index.len(),
        "index saved"
    );
    Ok(())
}

/// Loads the sidecar of `car_path`.
pub fn restore(car_path: &Path) -> Result<Index> {
    let path = index_path(car_path);
    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CarbsError::NotFound(path));
        }
        Err(e) => return Err(e.into()),
    };

    let index = decode_index_file(&bytes)?;
    info!(
        path = %path.display(),
        codec = %index.codec(),
        records = index.len(),
        "index restored"
    );
    Ok(index)
}

/// Decodes a complete sidecar image.
pub fn decode_index_file(bytes: &[u8]) -> Result<Index> {
    let (id, used) = read_uvarint_slice(bytes)
        .ok_or_else(|| CarbsError::corrupt("missing or malformed codec id"))?;
    let codec = IndexCodec::try_from(id)?;
    debug!(%codec, payload_len = bytes.len() - used, "decoding index payload");

    let mut index = codec.empty_index();
    index.unmarshal(&bytes[used..])?;
    Ok(index)
}

/// Encodes a complete sidecar image.
pub fn encode_index_file(index: &Index) -> Vec<u8> {
    let mut out = Vec::new();
    car_reader::varint::put_uvarint(&mut out, index.codec().as_u64());
    out.extend_from_slice(&index.to_bytes());
    out
}
