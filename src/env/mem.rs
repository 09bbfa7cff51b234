use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{Env, SequentialFile, WritableFile};
use crate::error::Result;

type Files = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file", path.display()),
    )
}

/// Failure points injected into a `MemEnv`. `None` means unlimited.
#[derive(Default)]
struct Faults {
    /// Bytes that may still be written across all files.
    write_budget: Option<usize>,
    /// Lines each newly opened file may return before failing.
    read_budget: Option<usize>,
}

/// Writes go straight into the shared file table.
pub struct MemWritableFile {
    files: Files,
    faults: Arc<Mutex<Faults>>,
    path: PathBuf,
}

impl WritableFile for MemWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        let mut faults = lock(&self.faults);
        let allowed = faults.write_budget.map_or(data.len(), |b| b.min(data.len()));
        if let Some(budget) = faults.write_budget.as_mut() {
            *budget -= allowed;
        }
        lock(&self.files)
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(&data[..allowed]);
        if allowed < data.len() {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure").into());
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads from a snapshot taken when the file was opened.
pub struct MemSequentialFile {
    data: Vec<u8>,
    offset: usize,
    lines_left: Option<usize>,
}

impl SequentialFile for MemSequentialFile {
    fn read_line(&mut self, buf: &mut String) -> Result<usize> {
        if let Some(left) = self.lines_left.as_mut() {
            if *left == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "injected read failure").into());
            }
            *left -= 1;
        }
        let rest = &self.data[self.offset..];
        let len = match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => rest.len(),
        };
        let line = std::str::from_utf8(&rest[..len])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        buf.push_str(line);
        self.offset += len;
        Ok(len)
    }
}

/// In-memory file system, shared between clones.
#[derive(Clone, Default)]
pub struct MemEnv {
    files: Files,
    faults: Arc<Mutex<Faults>>,
}

impl MemEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    /// Lets `bytes` more bytes through, then fails every append.
    pub fn fail_writes_after(&self, bytes: usize) {
        lock(&self.faults).write_budget = Some(bytes);
    }

    /// Files opened from now on fail after returning `lines` lines.
    pub fn fail_reads_after(&self, lines: usize) {
        lock(&self.faults).read_budget = Some(lines);
    }

    pub fn clear_faults(&self) {
        *lock(&self.faults) = Faults::default();
    }

    fn writable(&self, path: &Path) -> MemWritableFile {
        MemWritableFile {
            files: self.files.clone(),
            faults: self.faults.clone(),
            path: path.to_path_buf(),
        }
    }
}

impl Env for MemEnv {
    type WritableFile = MemWritableFile;
    type SequentialFile = MemSequentialFile;

    fn new_writable_file(&self, path: &Path) -> Result<Self::WritableFile> {
        lock(&self.files).insert(path.to_path_buf(), Vec::new());
        Ok(self.writable(path))
    }

    fn new_appendable_file(&self, path: &Path) -> Result<Self::WritableFile> {
        lock(&self.files).entry(path.to_path_buf()).or_default();
        Ok(self.writable(path))
    }

    fn new_sequential_file(&self, path: &Path) -> Result<Self::SequentialFile> {
        let data = lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))?;
        Ok(MemSequentialFile {
            data,
            offset: 0,
            lines_left: lock(&self.faults).read_budget,
        })
    }

    fn file_exists(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path)
    }

    fn rename_file(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = lock(&self.files);
        let data = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        match lock(&self.files).remove(path) {
            Some(_) => Ok(()),
            None => Err(not_found(path).into()),
        }
    }
}
