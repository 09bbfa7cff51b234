use std::path::PathBuf;

pub const DEFAULT_DUMP_PATH: &str = "./store/dump_file";

/// How `dump` treats an existing dump file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DumpMode {
    #[default]
    Truncate,
    /// Keep existing records and add the snapshot after them. Reloading
    /// still converges because later lines win.
    Append,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub dump_path: PathBuf,
    pub dump_mode: DumpMode,

    /// Seed for the height generator. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            dump_path: PathBuf::from(DEFAULT_DUMP_PATH),
            dump_mode: DumpMode::Truncate,
            seed: None,
        }
    }
}

impl Options {
    pub fn dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = path.into();
        self
    }

    pub fn dump_mode(mut self, mode: DumpMode) -> Self {
        self.dump_mode = mode;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
