//! Structured textual representation used by dump files.
//!
//! Every field is written as exactly one whitespace-free token or one
//! double-quoted string, so a reader can pull typed fields off the front of a
//! line without splitting on the delimiter.

use crate::error::{Error, Result};

pub trait TextEncode {
    fn encode_text(&self, out: &mut String);
}

pub trait TextDecode: Sized {
    /// Consumes one field from the front of `input`, skipping leading
    /// whitespace.
    fn decode_text(input: &mut &str) -> Result<Self>;
}

/// Splits off the next whitespace-delimited token.
pub fn next_token<'a>(input: &mut &'a str) -> Option<&'a str> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        *input = trimmed;
        return None;
    }
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (token, rest) = trimmed.split_at(end);
    *input = rest;
    Some(token)
}

/// Consumes `expected` as the next token.
pub fn expect_token(input: &mut &str, expected: &str) -> Result<()> {
    match next_token(input) {
        Some(token) if token == expected => Ok(()),
        Some(token) => Err(Error::Corruption(format!(
            "expected `{}`, found `{}`",
            expected, token
        ))),
        None => Err(Error::Corruption(format!(
            "expected `{}`, found end of line",
            expected
        ))),
    }
}

macro_rules! display_codec {
    ($($t:ty),* $(,)?) => {
        $(
            impl TextEncode for $t {
                fn encode_text(&self, out: &mut String) {
                    out.push_str(&self.to_string());
                }
            }

            impl TextDecode for $t {
                fn decode_text(input: &mut &str) -> Result<Self> {
                    let token = next_token(input).ok_or_else(|| {
                        Error::Corruption(format!("missing {} field", stringify!($t)))
                    })?;
                    token.parse::<$t>().map_err(|e| {
                        Error::Corruption(format!(
                            "invalid {} `{}`: {}",
                            stringify!($t),
                            token,
                            e
                        ))
                    })
                }
            }
        )*
    };
}

display_codec!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool);

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s == crate::dump::DELIMITER
        || s.starts_with('"')
        || s.chars().any(|c| c.is_whitespace() || c == '\\')
}

impl TextEncode for str {
    fn encode_text(&self, out: &mut String) {
        if !needs_quotes(self) {
            out.push_str(self);
            return;
        }
        out.reserve(self.len() + 2);
        out.push('"');
        for c in self.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push('"');
    }
}

impl TextEncode for String {
    fn encode_text(&self, out: &mut String) {
        self.as_str().encode_text(out)
    }
}

impl TextDecode for String {
    fn decode_text(input: &mut &str) -> Result<Self> {
        let trimmed = input.trim_start();
        let Some(quoted) = trimmed.strip_prefix('"') else {
            let token = next_token(input)
                .ok_or_else(|| Error::Corruption("missing string field".into()))?;
            return Ok(token.to_owned());
        };

        let mut value = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    *input = &quoted[i + 1..];
                    return Ok(value);
                }
                '\\' => match chars.next() {
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => {
                        return Err(Error::Corruption(format!(
                            "unknown escape `\\{}`",
                            other
                        )))
                    }
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(Error::Corruption("unterminated string".into()))
    }
}

impl TextEncode for char {
    fn encode_text(&self, out: &mut String) {
        let mut buf = [0u8; 4];
        self.encode_utf8(&mut buf).encode_text(out)
    }
}

impl TextDecode for char {
    fn decode_text(input: &mut &str) -> Result<Self> {
        let s = String::decode_text(input)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::Corruption(format!("invalid char `{}`", s))),
        }
    }
}
