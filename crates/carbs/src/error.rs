use std::path::PathBuf;

use car_reader::{CarReadError, Cid};
use thiserror::Error;

/// Index and blockstore error types
#[derive(Error, Debug)]
pub enum CarbsError {
    /// Sidecar index file does not exist
    #[error("index file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Sidecar starts with a codec id this build cannot decode
    #[error("unknown index codec: {0:#x}")]
    UnknownCodec(u64),

    /// Malformed index payload, or an archive section that does not match the index
    #[error("corrupt index or archive: {0}")]
    Corrupt(String),

    /// SingleSorted index fed digests of more than one length
    #[error("mixed digest lengths: expected {expected} bytes, found {found}")]
    MixedDigestLength { expected: usize, found: usize },

    /// Digest-keyed index fed two different CIDs over the same digest bytes
    #[error("{first} and {second} share a digest; use the hashed codec")]
    SharedDigest { first: Cid, second: Cid },

    /// Well-formed query for a CID the archive does not hold
    #[error("record not found: {0}")]
    RecordNotFound(Cid),

    /// Strict open without a sidecar index
    #[error("index missing for strict open: {}", .0.display())]
    IndexMissing(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive framing error while scanning
    #[error("CAR error: {0}")]
    Car(#[from] CarReadError),
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, CarbsError>;

impl CarbsError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        CarbsError::Corrupt(msg.into())
    }
}
