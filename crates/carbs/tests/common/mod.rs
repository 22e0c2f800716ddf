#![allow(dead_code)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use car_reader::{CarHeader, CarWriter};
use carbs::Cid;
use cid::multihash::Multihash;

pub const DAG_CBOR: u64 = 0x71;
pub const RAW: u64 = 0x55;
pub const BLAKE3: u64 = 0x1e;
pub const SHA1: u64 = 0x11;

/// CID over a 32-byte blake3 digest of `data`.
pub fn block_cid(codec: u64, data: &[u8]) -> Cid {
    let digest = blake3::hash(data);
    Cid::new_v1(codec, Multihash::wrap(BLAKE3, digest.as_bytes()).unwrap())
}

/// CID over a 20-byte digest, for mixed-length archives.
pub fn short_cid(codec: u64, data: &[u8]) -> Cid {
    let digest = blake3::hash(data);
    Cid::new_v1(codec, Multihash::wrap(SHA1, &digest.as_bytes()[..20]).unwrap())
}

pub fn cid_from_digest(digest: &[u8]) -> Cid {
    let code = if digest.len() == 20 { SHA1 } else { BLAKE3 };
    Cid::new_v1(RAW, Multihash::wrap(code, digest).unwrap())
}

/// Writes an archive and returns the relative position of every block.
pub fn write_car(path: &Path, roots: &[Cid], blocks: &[(Cid, Vec<u8>)]) -> Vec<u64> {
    let f = BufWriter::new(File::create(path).unwrap());
    let mut w = CarWriter::new(f, &CarHeader::new(roots.to_vec())).unwrap();
    let positions = blocks
        .iter()
        .map(|(cid, data)| w.write_block(cid, data).unwrap())
        .collect();
    w.flush().unwrap();
    positions
}

/// A root node linking ten children, root written first.
pub fn linked_blocks() -> Vec<(Cid, Vec<u8>)> {
    let children: Vec<(Cid, Vec<u8>)> = (0u8..10)
        .map(|i| {
            let data = vec![i];
            (block_cid(RAW, &data), data)
        })
        .collect();

    let mut root_data = b"root".to_vec();
    for (cid, _) in &children {
        root_data.extend_from_slice(&cid.to_bytes());
    }
    let root = (block_cid(DAG_CBOR, &root_data), root_data);

    std::iter::once(root).chain(children).collect()
}

pub fn car_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
