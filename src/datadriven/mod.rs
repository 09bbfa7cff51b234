//! Script-driven test harness.
//!
//! A test file is a sequence of blocks:
//!
//! ```text
//! # comment
//! <cmd> [arg | arg=val | arg=(v1, v2)]...
//! <input lines>
//! ----
//! <expected output lines>
//! <blank line>
//! ```

use std::{fs, path::Path};

use regex::Regex;

use crate::error::{Error, Result};

#[derive(Default, Debug)]
pub struct TestData {
    pub pos: String,
    pub cmd: String,
    pub cmd_args: Vec<CmdArg>,
    pub input: String,
    pub expected: String,
}

#[derive(Debug)]
pub struct CmdArg {
    pub key: String,
    pub vals: Vec<String>,
}

impl CmdArg {
    pub fn string(&self, idx: usize) -> String {
        self.vals[idx].clone()
    }
    pub fn int64(&self, idx: usize) -> i64 {
        self.vals[idx].parse().unwrap()
    }
}

impl TestData {
    pub fn find_arg(&self, key: &str) -> Option<&CmdArg> {
        self.cmd_args.iter().find(|&f| f.key == key)
    }
    pub fn scan_args(&self, key: &str) -> &CmdArg {
        if let Some(arg) = self.find_arg(key) {
            arg
        } else {
            panic!("{}: missing args: {}", self.pos, key);
        }
    }
    pub fn has_arg(&self, key: &str) -> bool {
        self.find_arg(key).is_some()
    }
}

pub fn run_test<F: Fn(&TestData) -> String>(path: impl AsRef<Path>, f: F) {
    let path = path.as_ref();
    let content = fs::read_to_string(path).unwrap();
    let datas = parse_test_data(&content, &path.display().to_string()).unwrap();
    for data in datas.iter() {
        let s = f(data);
        assert_eq!(s, data.expected, "{}: {}", data.pos, data.cmd);
    }
}

pub fn run_test_from_string<F: Fn(&TestData) -> String>(input: impl AsRef<str>, f: F) {
    let datas = parse_test_data(input.as_ref(), "").unwrap();
    for data in datas.iter() {
        let s = f(data);
        assert_eq!(s, data.expected, "{}: {}", data.pos, data.cmd);
    }
}

pub fn parse_test_data(input: &str, source: &str) -> Result<Vec<TestData>> {
    let directive = Regex::new(PATTERN).map_err(|e| Error::Corruption(e.to_string()))?;
    let mut datas = Vec::new();

    let mut iter = input.lines().enumerate();
    while let Some((line_no, line)) = iter.next() {
        if line.starts_with('#') {
            continue;
        }
        let fields = split_directive(&directive, line)
            .ok_or_else(|| Error::Corruption(format!("{}:{}: {}", source, line_no + 1, line)))?;
        if fields.is_empty() {
            continue;
        }

        let mut data = TestData {
            pos: format!("{}:{}", source, line_no + 1),
            cmd: fields[0].clone(),
            ..Default::default()
        };
        for arg in &fields[1..] {
            if let Some(idx) = arg.find('=') {
                let key = arg[0..idx].to_owned();
                let val = &arg[idx + 1..];

                let vals = if val.len() > 2 && val.starts_with('(') && val.ends_with(')') {
                    val[1..val.len() - 1]
                        .split(',')
                        .map(|s| s.trim().to_owned())
                        .collect()
                } else {
                    vec![val.to_owned()]
                };
                data.cmd_args.push(CmdArg { key, vals });
            } else {
                data.cmd_args.push(CmdArg {
                    key: arg.clone(),
                    vals: Vec::new(),
                })
            }
        }

        let mut buf = String::new();
        let mut separator = false;
        for (_, line) in iter.by_ref() {
            if line == "----" {
                separator = true;
                break;
            }
            buf.push_str(line);
            buf.push('\n');
        }
        data.input = buf.trim().to_owned();

        if separator {
            let mut buf = String::new();
            for (_, line) in iter.by_ref() {
                let line = line.trim();
                if line.is_empty() {
                    break;
                }
                buf.push_str(line);
                buf.push('\n');
            }
            data.expected = buf;
        }
        datas.push(data);
    }

    Ok(datas)
}

const PATTERN: &str = r"^ *[a-zA-Z0-9_/,-\.]+(|=[-a-zA-Z0-9_@]+|=\([^)]*\))( |$)";

fn split_directive(p: &Regex, mut line: &str) -> Option<Vec<String>> {
    let mut results = Vec::new();
    while !line.trim().is_empty() {
        let v = p.find(line)?.as_str();
        line = &line[v.len()..];
        results.push(v.trim().to_string());
    }
    Some(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_directive() {
        let p = Regex::new(PATTERN).unwrap();
        let input = "make argTuple=(1, 🍌) argInt=12 argString=greedily argString=totally_ignored";
        let cmds = split_directive(&p, input).unwrap();
        assert_eq!(cmds.len(), 5);
        assert_eq!(cmds[0], "make");
        assert_eq!(cmds.last().unwrap(), "argString=totally_ignored");

        assert!(split_directive(&p, "bad=(unclosed").is_none());
    }

    #[test]
    fn test_from_string() {
        let input = r"
# NB: we allow duplicate args. It's unclear at this time whether this is useful,
# either way, ScanArgs simply picks the first occurrence.
make argTuple=(1, 🍌) argInt=12 argString=greedily argString=totally_ignored
sentence
----
Did the following: make sentence
1 hungry monkey eats a 🍌
while 12 other monkeys watch greedily

echo
second block
----
second block
";
        let datas = parse_test_data(input, "inline").unwrap();
        assert_eq!(datas.len(), 2);
        assert_eq!(datas[1].pos, "inline:11");

        run_test_from_string(input, |t| match t.cmd.as_str() {
            "make" => {
                assert_eq!(t.input, "sentence");
                assert_eq!(t.cmd_args.len(), 4);
                let arg_str = t.scan_args("argString");
                assert_eq!(arg_str.string(0), "greedily");
                let arg_int = t.scan_args("argInt");
                assert_eq!(arg_int.int64(0), 12);
                let arg_tuple = t.scan_args("argTuple");
                assert_eq!(arg_tuple.int64(0), 1);
                format!(
                    "Did the following: {} {}\n{} hungry monkey eats a {}\nwhile {} other monkeys watch {}\n",
                    t.cmd,
                    t.input,
                    arg_tuple.int64(0),
                    arg_tuple.string(1),
                    arg_int.int64(0),
                    arg_str.string(0)
                )
            }
            _ => format!("{}\n", t.input),
        });
    }
}
