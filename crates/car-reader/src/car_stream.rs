use std::{fs::File, path::Path};

use cid::Cid;

use crate::{
    CarBlockReader,
    error::{CarReadError as CarError, CarReadResult as Result},
    header::CarHeader,
};

const CAR_BUF: usize = 8 << 20;

/// Opens an archive on disk and walks its sections in order, yielding each
/// block's CID and relative position. Restart by opening again.
pub struct CarStream<R: std::io::Read> {
    car: CarBlockReader<R>,
    header: CarHeader,
    header_len: u64,
}

impl<R: std::io::Read> CarStream<R> {
    pub fn from_reader(inner: R) -> Result<Self> {
        let mut car = CarBlockReader::with_capacity(inner, CAR_BUF);
        let (header, header_len) = car.read_header()?;
        Ok(Self {
            car,
            header,
            header_len,
        })
    }

    #[inline]
    pub fn roots(&self) -> &[Cid] {
        &self.header.roots
    }

    #[inline]
    pub fn header(&self) -> &CarHeader {
        &self.header
    }

    /// Bytes occupied by the framed header; add to a relative position to get
    /// a file offset.
    #[inline]
    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    #[inline(always)]
    pub fn next_record(&mut self) -> Result<Option<(Cid, u64)>> {
        self.car.next_block_position()
    }
}

impl<R: std::io::Read> Iterator for CarStream<R> {
    type Item = Result<(Cid, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl CarStream<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            CarError::Io(std::io::Error::new(
                e.kind(),
                format!("open {}: {e}", path.display()),
            ))
        })?;
        Self::from_reader(file)
    }
}
