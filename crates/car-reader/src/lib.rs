//! CAR (Content Addressable aRchive) v1 framing.
//!
//! Positions are relative to the end of the header, so the first section of
//! every archive sits at position 0.

pub mod car_stream;
pub mod error;
pub mod header;
pub mod reader;
pub mod section;
pub mod varint;
pub mod writer;

pub use car_stream::CarStream;
pub use error::{CarReadError, CarReadResult};
pub use header::CarHeader;
pub use reader::{CarBlockReader, CarSection};
pub use section::decode_section;
pub use writer::CarWriter;

pub use cid::Cid;
