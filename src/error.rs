use std::{io, result};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("key not found")]
    KeyNotFound,

    #[error("key already exists, use update")]
    KeyAlreadyExists,

    #[error("io error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("corrupted dump file: {0}")]
    Corruption(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::KeyAlreadyExists)
    }
}

pub type Result<T> = result::Result<T, Error>;
