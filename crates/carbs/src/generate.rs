use std::path::Path;
use std::time::Instant;

use car_reader::CarStream;
use tracing::{debug, info};

use crate::error::Result;
use crate::index::{Index, IndexCodec};
use crate::record::{Record, shared_digest, uniform_digest_len};

/// Log scan progress every N records.
pub const PROGRESS_EVERY: usize = 1_000_000;

/// Walks every section of the archive at `car_path`, in archive order.
pub fn scan_records(car_path: &Path) -> Result<Vec<Record>> {
    let start = Instant::now();
    let mut stream = CarStream::open(car_path)?;

    let mut records = Vec::new();
    while let Some((cid, offset)) = stream.next_record()? {
        records.push(Record::new(cid, offset));
        if records.len() % PROGRESS_EVERY == 0 {
            debug!(
                records = records.len(),
                elapsed_s = start.elapsed().as_secs_f64(),
                "scanning archive"
            );
        }
    }

    info!(
        path = %car_path.display(),
        records = records.len(),
        elapsed_s = start.elapsed().as_secs_f64(),
        "archive scanned"
    );
    Ok(records)
}

/// Hashed when two different CIDs share a digest, else SingleSorted when
/// every digest has the same length, Sorted otherwise.
pub fn default_codec(records: &[Record]) -> IndexCodec {
    if let Some((first, second)) = shared_digest(records) {
        debug!(%first, %second, "cids share a digest, using hashed index");
        IndexCodec::Hashed
    } else if uniform_digest_len(records) {
        IndexCodec::SingleSorted
    } else {
        IndexCodec::Sorted
    }
}

/// Scans the archive and builds an index of `codec`. The sidecar is not touched.
pub fn generate_index(car_path: &Path, codec: IndexCodec) -> Result<Index> {
    let records = scan_records(car_path)?;
    build_index(&records, codec)
}

/// Like [`generate_index`] with the codec picked by [`default_codec`].
pub fn generate_index_default(car_path: &Path) -> Result<Index> {
    let records = scan_records(car_path)?;
    build_index(&records, default_codec(&records))
}

fn build_index(records: &[Record], codec: IndexCodec) -> Result<Index> {
    let start = Instant::now();
    let index = Index::build(codec, records)?;
    info!(
        %codec,
        records = index.len(),
        elapsed_s = start.elapsed().as_secs_f64(),
        "index built"
    );
    Ok(index)
}
