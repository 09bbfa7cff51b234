use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use super::{Env, SequentialFile, WritableFile};
use crate::error::Result;

pub struct PosixWritableFile(BufWriter<File>);

impl WritableFile for PosixWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        Ok(self.0.write_all(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.0.flush()?)
    }

    fn sync(&mut self) -> Result<()> {
        self.0.flush()?;
        Ok(self.0.get_ref().sync_all()?)
    }
}

pub struct PosixSequentialFile(BufReader<File>);

impl SequentialFile for PosixSequentialFile {
    fn read_line(&mut self, buf: &mut String) -> Result<usize> {
        Ok(self.0.read_line(buf)?)
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct PosixEnv {}

impl Env for PosixEnv {
    type WritableFile = PosixWritableFile;
    type SequentialFile = PosixSequentialFile;

    fn new_writable_file(&self, path: &Path) -> Result<Self::WritableFile> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(PosixWritableFile(BufWriter::new(file)))
    }

    fn new_appendable_file(&self, path: &Path) -> Result<Self::WritableFile> {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(PosixWritableFile(BufWriter::new(file)))
    }

    fn new_sequential_file(&self, path: &Path) -> Result<Self::SequentialFile> {
        let file = fs::OpenOptions::new().read(true).open(path)?;
        Ok(PosixSequentialFile(BufReader::new(file)))
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename_file(&self, from: &Path, to: &Path) -> Result<()> {
        Ok(fs::rename(from, to)?)
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(path)?)
    }
}
