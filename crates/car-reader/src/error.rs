use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarReadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected eof: {0}")]
    UnexpectedEof(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("varint overflow: {0}")]
    VarintOverflow(String),

    #[error("cid error: {0}")]
    Cid(String),

    #[error("invalid entry length: {0}")]
    InvalidEntryLen(String),

    #[error("header error: {0}")]
    Header(String),
}

pub type CarReadResult<T> = std::result::Result<T, CarReadError>;

impl From<cid::Error> for CarReadError {
    fn from(e: cid::Error) -> Self {
        CarReadError::Cid(e.to_string())
    }
}

impl From<minicbor::decode::Error> for CarReadError {
    fn from(e: minicbor::decode::Error) -> Self {
        CarReadError::Header(e.to_string())
    }
}
