use std::fs::File;
use std::path::{Path, PathBuf};

use car_reader::{CarHeader, Cid, decode_section};
use memmap2::Mmap;
use tracing::{info, warn};

use crate::error::{CarbsError, Result};
use crate::generate::{default_codec, scan_records};
use crate::index::{Index, IndexCodec};
use crate::persist::{index_path, restore, save};

/// How [`Carbs`] obtains its index.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    strict: bool,
    codec: Option<IndexCodec>,
    persist: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            codec: None,
            persist: true,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an existing sidecar; never rescan.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Codec to build when the sidecar is missing. Defaults to
    /// [`default_codec`]'s choice for the scanned records.
    pub fn codec(mut self, codec: IndexCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Save a freshly built index next to the archive.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<Carbs> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: archives are append-only and are not modified while mapped.
        let data = unsafe { Mmap::map(&file)? };
        let (header, header_len) = CarHeader::read_framed(&data)?;

        let index = self.obtain_index(path)?;
        info!(
            path = %path.display(),
            roots = header.roots.len(),
            codec = %index.codec(),
            records = index.len(),
            "archive opened"
        );

        Ok(Carbs {
            path: path.to_path_buf(),
            data,
            roots: header.roots,
            header_len,
            index,
        })
    }

    fn obtain_index(&self, path: &Path) -> Result<Index> {
        match restore(path) {
            Ok(index) => Ok(index),
            Err(CarbsError::NotFound(idx_path)) if self.strict => {
                Err(CarbsError::IndexMissing(idx_path))
            }
            Err(CarbsError::NotFound(idx_path)) => {
                warn!(
                    index = %idx_path.display(),
                    "no index file, rebuilding from archive"
                );
                let records = scan_records(path)?;
                let codec = self.codec.unwrap_or_else(|| default_codec(&records));
                let index = Index::build(codec, &records)?;
                if self.persist {
                    save(&index, path)?;
                }
                Ok(index)
            }
            Err(e) => Err(e),
        }
    }
}

/// Read-only blockstore over one CAR archive.
///
/// The archive is memory mapped, so `get`/`has`/`roots` take `&self` and may
/// run from many threads at once.
pub struct Carbs {
    path: PathBuf,
    data: Mmap,
    roots: Vec<Cid>,
    header_len: u64,
    index: Index,
}

impl Carbs {
    /// Opens `path`. With `strict`, a missing sidecar is `IndexMissing`;
    /// otherwise the archive is scanned and a new sidecar written.
    pub fn open(path: impl AsRef<Path>, strict: bool) -> Result<Self> {
        LoadOptions::new().strict(strict).open(path)
    }

    /// Root CIDs in header order.
    #[inline]
    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    /// Payload of the block named `cid`.
    pub fn get(&self, cid: &Cid) -> Result<&[u8]> {
        let offset = self
            .index
            .lookup(cid)
            .ok_or(CarbsError::RecordNotFound(*cid))?;
        let (found, payload) = self.section_at(offset)?;
        if found != *cid {
            return Err(CarbsError::Corrupt(format!(
                "index maps {cid} to offset {offset}, which holds {found}"
            )));
        }
        Ok(payload)
    }

    pub fn has(&self, cid: &Cid) -> Result<bool> {
        let Some(offset) = self.index.lookup(cid) else {
            return Ok(false);
        };
        let (found, _) = self.section_at(offset)?;
        Ok(found == *cid)
    }

    pub fn get_size(&self, cid: &Cid) -> Result<usize> {
        self.get(cid).map(<[u8]>::len)
    }

    /// Every block CID in archive order, duplicates included.
    pub fn all_keys(&self) -> Keys<'_> {
        Keys {
            blocks: &self.data[self.header_len as usize..],
            pos: 0,
            failed: false,
        }
    }

    #[inline]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[inline]
    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index_path(&self) -> PathBuf {
        index_path(&self.path)
    }

    fn section_at(&self, offset: u64) -> Result<(Cid, &[u8])> {
        let at = self
            .header_len
            .checked_add(offset)
            .filter(|&at| at < self.data.len() as u64)
            .ok_or_else(|| {
                CarbsError::Corrupt(format!(
                    "offset {offset} is past the end of {}",
                    self.path.display()
                ))
            })?;
        let (cid, payload, _) = decode_section(&self.data[at as usize..])
            .map_err(|e| CarbsError::Corrupt(format!("section at offset {offset}: {e}")))?;
        Ok((cid, payload))
    }
}

/// Iterator over the block CIDs of a mapped archive.
pub struct Keys<'a> {
    blocks: &'a [u8],
    pos: usize,
    failed: bool,
}

impl Iterator for Keys<'_> {
    type Item = Result<Cid>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.blocks.len() {
            return None;
        }
        match decode_section(&self.blocks[self.pos..]) {
            Ok((cid, _, used)) => {
                self.pos += used;
                Some(Ok(cid))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e.into()))
            }
        }
    }
}
