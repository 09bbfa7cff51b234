//! Line-oriented command front end over `SkipList<i64, String>`.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::{error::Result, skiplist::SkipList};

pub type Key = i64;
pub type Value = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert(Key, Value),
    Delete(Key),
    Update(Key, Value),
    Get(Key),
    Dump,
    Load,
    Quit,
}

impl Command {
    /// Parses one input line. Unknown commands and malformed arguments yield
    /// `None`.
    pub fn parse(line: &str) -> Option<Command> {
        let mut tokens = line.split_whitespace();
        let op = tokens.next()?;
        let cmd = match op {
            "insert" => Command::Insert(tokens.next()?.parse().ok()?, tokens.next()?.to_owned()),
            "delete" => Command::Delete(tokens.next()?.parse().ok()?),
            "update" => Command::Update(tokens.next()?.parse().ok()?, tokens.next()?.to_owned()),
            "get" => Command::Get(tokens.next()?.parse().ok()?),
            "dump" => Command::Dump,
            "load" => Command::Load,
            "quit" => Command::Quit,
            _ => return None,
        };
        if tokens.next().is_some() {
            return None;
        }
        Some(cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    Value(Key, Value),
    Quit,
}

pub struct Dispatcher {
    list: SkipList<Key, Value>,
}

impl Dispatcher {
    pub fn new(list: SkipList<Key, Value>) -> Self {
        Dispatcher { list }
    }

    pub fn list(&self) -> &SkipList<Key, Value> {
        &self.list
    }

    pub fn execute(&self, cmd: Command) -> Result<Reply> {
        match cmd {
            Command::Insert(key, value) => self.list.insert(key, value)?,
            Command::Delete(key) => self.list.delete(&key)?,
            Command::Update(key, value) => self.list.update(&key, value)?,
            Command::Get(key) => {
                let value = self.list.get(&key)?;
                return Ok(Reply::Value(key, value));
            }
            Command::Dump => {
                self.list.dump()?;
            }
            Command::Load => {
                self.list.load()?;
            }
            Command::Quit => return Ok(Reply::Quit),
        }
        Ok(Reply::Done)
    }

    /// Runs commands from `input` until `quit` or end of input. `get` results
    /// go to `out`; failures are reported on `diag`.
    pub fn run<R, W, E>(&self, input: R, out: &mut W, diag: &mut E) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        for line in input.lines() {
            let line = line?;
            let Some(cmd) = Command::parse(&line) else {
                debug!(line = %line, "ignored input");
                continue;
            };
            match self.execute(cmd) {
                Ok(Reply::Done) => {}
                Ok(Reply::Value(key, value)) => {
                    writeln!(out, "{}:{}", key, value)?;
                    out.flush()?;
                }
                Ok(Reply::Quit) => break,
                Err(e) => writeln!(diag, "{}", e)?,
            }
        }
        out.flush()
    }
}
