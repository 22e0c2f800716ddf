pub mod index;
pub mod read;
