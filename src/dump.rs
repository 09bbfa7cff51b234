//! Flat-file snapshots of a skip list.
//!
//! One record per line, `<key> : <value>`, in key order. Fields use the
//! `codec` text representation so delimiters inside keys or values survive.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{
    cmp::Comparator,
    codec::{expect_token, next_token, TextDecode, TextEncode},
    env::{posix::PosixEnv, Env, SequentialFile, WritableFile},
    error::{Error, Result},
    options::DumpMode,
    skiplist::SkipList,
};

pub const DELIMITER: &str = ":";

pub struct DumpWriter<W: WritableFile> {
    writer: W,
    line: String,
    records: usize,
}

impl<W: WritableFile> DumpWriter<W> {
    pub fn new(writer: W) -> Self {
        DumpWriter {
            writer,
            line: String::new(),
            records: 0,
        }
    }

    pub fn add_record<K, V>(&mut self, key: &K, value: &V) -> Result<()>
    where
        K: TextEncode + ?Sized,
        V: TextEncode + ?Sized,
    {
        self.line.clear();
        key.encode_text(&mut self.line);
        self.line.push(' ');
        self.line.push_str(DELIMITER);
        self.line.push(' ');
        value.encode_text(&mut self.line);
        self.line.push('\n');
        self.writer.append(self.line.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Flushes and syncs the file, returning the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        self.writer.sync()?;
        Ok(self.records)
    }
}

pub struct DumpReader<R: SequentialFile> {
    src: R,
    line: String,
    line_no: usize,
}

impl<R: SequentialFile> DumpReader<R> {
    pub fn new(src: R) -> Self {
        DumpReader {
            src,
            line: String::new(),
            line_no: 0,
        }
    }

    /// 1-based number of the last line read.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Returns the next record, skipping blank lines, or `None` at end of file.
    pub fn read_record<K: TextDecode, V: TextDecode>(&mut self) -> Result<Option<(K, V)>> {
        loop {
            self.line.clear();
            if self.src.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if self.line.trim().is_empty() {
                continue;
            }
            return parse_record(&self.line)
                .map(Some)
                .map_err(|e| match e {
                    Error::Corruption(msg) => {
                        Error::Corruption(format!("line {}: {}", self.line_no, msg))
                    }
                    e => e,
                });
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn parse_record<K: TextDecode, V: TextDecode>(line: &str) -> Result<(K, V)> {
    let mut input = line;
    let key = K::decode_text(&mut input)?;
    expect_token(&mut input, DELIMITER)?;
    let value = V::decode_text(&mut input)?;
    if let Some(extra) = next_token(&mut input) {
        return Err(Error::Corruption(format!("trailing data `{}`", extra)));
    }
    Ok((key, value))
}

impl<K, V, C> SkipList<K, V, C>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: Comparator<K>,
{
    /// Writes every entry to `Options::dump_path`.
    pub fn dump(&self) -> Result<usize>
    where
        K: TextEncode,
        V: TextEncode,
    {
        self.dump_with(&PosixEnv {}, &self.options().dump_path)
    }

    pub fn dump_to(&self, path: impl AsRef<Path>) -> Result<usize>
    where
        K: TextEncode,
        V: TextEncode,
    {
        self.dump_with(&PosixEnv {}, path.as_ref())
    }

    /// Holds the write lock for the whole walk, so the file is a consistent
    /// snapshot. Readers keep running.
    ///
    /// In `DumpMode::Truncate` the records go to `<path>.tmp`, which replaces
    /// `path` only once every record is synced. A failed dump leaves the
    /// previous snapshot in place.
    pub fn dump_with<E: Env>(&self, env: &E, path: &Path) -> Result<usize>
    where
        K: TextEncode,
        V: TextEncode,
    {
        let _writer = self.lock_writer();
        let result = match self.options().dump_mode {
            DumpMode::Truncate => {
                let tmp = temp_path(path);
                let written = env
                    .new_writable_file(&tmp)
                    .and_then(|file| self.write_entries(file))
                    .and_then(|records| env.rename_file(&tmp, path).map(|_| records));
                if written.is_err() && env.file_exists(&tmp) {
                    if let Err(e) = env.delete_file(&tmp) {
                        warn!(path = %tmp.display(), error = %e, "cannot remove partial dump");
                    }
                }
                written
            }
            DumpMode::Append => env
                .new_appendable_file(path)
                .and_then(|file| self.write_entries(file)),
        };

        match &result {
            Ok(records) => info!(path = %path.display(), records, "dumped skiplist"),
            Err(e) => warn!(path = %path.display(), error = %e, "dump failed"),
        }
        result
    }

    fn write_entries<W: WritableFile>(&self, file: W) -> Result<usize>
    where
        K: TextEncode,
        V: TextEncode,
    {
        let mut writer = DumpWriter::new(file);
        self.for_each_entry(|key, value| writer.add_record(key, value))?;
        writer.finish()
    }

    /// Reads `Options::dump_path` back in. Existing keys are overwritten, so
    /// loading is safe on a non-empty list and repeatable.
    pub fn load(&self) -> Result<usize>
    where
        K: TextDecode,
        V: TextDecode,
    {
        self.load_with(&PosixEnv {}, &self.options().dump_path)
    }

    pub fn load_from(&self, path: impl AsRef<Path>) -> Result<usize>
    where
        K: TextDecode,
        V: TextDecode,
    {
        self.load_with(&PosixEnv {}, path.as_ref())
    }

    /// Records applied before a failure stay in the list.
    pub fn load_with<E: Env>(&self, env: &E, path: &Path) -> Result<usize>
    where
        K: TextDecode,
        V: TextDecode,
    {
        let file = env.new_sequential_file(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "cannot open dump file");
            e
        })?;

        let mut reader = DumpReader::new(file);
        let mut applied = 0;
        let mut created = 0;
        loop {
            let record = reader.read_record::<K, V>().map_err(|e| {
                warn!(path = %path.display(), applied, error = %e, "load stopped");
                e
            })?;
            let Some((key, value)) = record else {
                break;
            };
            if self.insert_or_update(key, value) {
                created += 1;
            }
            applied += 1;
        }
        info!(path = %path.display(), applied, created, "loaded skiplist");
        Ok(applied)
    }
}
