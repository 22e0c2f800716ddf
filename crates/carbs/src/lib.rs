//! Read-only blockstore over CAR archives with persistent block indexes.
//!
//! An index maps each block's CID to the offset of its section relative to
//! the end of the archive header. Three codecs are available: a hash table
//! (`Hashed`), per-digest-length sorted tables (`Sorted`) and a single sorted
//! table for archives with one digest length (`SingleSorted`). Indexes are
//! persisted next to the archive as `<archive>.idx`, tagged with their codec
//! id so they can be restored without knowing the codec up front.
//!
//! ```no_run
//! use carbs::Carbs;
//!
//! let car = Carbs::open("blocks.car", false)?;
//! for root in car.roots() {
//!     let block = car.get(root)?;
//!     println!("{root}: {} bytes", block.len());
//! }
//! # Ok::<(), carbs::CarbsError>(())
//! ```

pub mod error;
pub mod generate;
pub mod index;
pub mod loader;
pub mod persist;
pub mod record;

pub use error::{CarbsError, Result};
pub use generate::{default_codec, generate_index, generate_index_default, scan_records};
pub use index::{INDEX_CODECS, Index, IndexCodec};
pub use loader::{Carbs, Keys, LoadOptions};
pub use persist::{INDEX_SUFFIX, index_path, restore, save};
pub use record::{NOT_FOUND, Record};

pub use car_reader::Cid;
