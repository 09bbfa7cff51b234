pub mod mem;
pub mod posix;

use std::path::Path;

use crate::error::Result;

pub trait WritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn sync(&mut self) -> Result<()>;
}

pub trait SequentialFile {
    /// Reads up to and including the next `\n` into `buf`. Returns 0 at end of file.
    fn read_line(&mut self, buf: &mut String) -> Result<usize>;
}

pub trait Env: Send + Sync + Clone + 'static {
    type WritableFile: WritableFile + 'static;
    type SequentialFile: SequentialFile + 'static;

    /// Opens `path` for writing, truncating existing content.
    fn new_writable_file(&self, path: &Path) -> Result<Self::WritableFile>;
    /// Opens `path` for writing after existing content.
    fn new_appendable_file(&self, path: &Path) -> Result<Self::WritableFile>;
    fn new_sequential_file(&self, path: &Path) -> Result<Self::SequentialFile>;
    fn file_exists(&self, path: &Path) -> bool;
    /// Replaces `to` with `from` in one step.
    fn rename_file(&self, from: &Path, to: &Path) -> Result<()>;
    fn delete_file(&self, path: &Path) -> Result<()>;
}
