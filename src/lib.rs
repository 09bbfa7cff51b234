pub mod cli;
mod cmp;
pub mod codec;
#[cfg(test)]
mod datadriven;
mod dump;
pub mod env;
mod error;
mod options;
mod skiplist;

pub use cmp::{BytewiseComparator, Comparator, OrdComparator, ReverseComparator};
pub use codec::{TextDecode, TextEncode};
pub use dump::{DumpReader, DumpWriter, DELIMITER};
pub use env::{mem::MemEnv, posix::PosixEnv, Env};
pub use error::{Error, Result};
pub use options::{DumpMode, Options, DEFAULT_DUMP_PATH};
pub use skiplist::{Iter, SkipList, MAX_HEIGHT};
