//! Identifier validation and argument tokenizing.
//!
//! A raw line is split on any byte of the field separator set. Consecutive
//! separators collapse, so no empty arguments are produced. The tokenizer
//! borrows the stored line and only moves a cursor; it never rewrites the
//! line, so re-tokenizing starts again from the untouched bytes.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Check that a raw line starts with the identifier prefix.
///
/// The comparison is byte-for-byte and case-sensitive.
pub fn is_valid_command(line: &[u8], identifier: &[u8]) -> bool {
    line.starts_with(identifier)
}

/// Split a raw line into its command identifier and an argument tokenizer.
///
/// Returns `None` if the line does not start with `identifier`. The command
/// identifier is everything between the prefix and the first field separator,
/// and may be empty.
pub fn split_command<'a>(
    line: &'a [u8],
    identifier: &[u8],
    separators: &'a [u8],
) -> Option<(Token<'a>, Tokenizer<'a>)> {
    let rest = line.strip_prefix(identifier)?;
    let end = rest
        .iter()
        .position(|b| separators.contains(b))
        .unwrap_or(rest.len());
    Some((Token(&rest[..end]), Tokenizer::new(&rest[end..], separators)))
}

/// A single token borrowed from a raw line.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token<'a>(&'a [u8]);

impl<'a> Token<'a> {
    /// Wrap raw bytes as a token.
    pub fn new(bytes: &'a [u8]) -> Self {
        Token(bytes)
    }

    /// The raw token bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    /// The token as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.0).ok()
    }

    /// The token as text, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.0)
    }

    /// Parse the token into a typed value.
    pub fn parse<T: FromStr>(&self) -> Option<T> {
        self.as_str()?.parse().ok()
    }

    /// Token length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl PartialEq<str> for Token<'_> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Token<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

/// Lazy cursor over the arguments of a raw line.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    line: &'a [u8],
    pos: usize,
    separators: &'a [u8],
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over `line` splitting on any byte in `separators`.
    pub fn new(line: &'a [u8], separators: &'a [u8]) -> Self {
        Tokenizer {
            line,
            pos: 0,
            separators,
        }
    }

    fn is_separator(&self, byte: u8) -> bool {
        self.separators.contains(&byte)
    }

    /// Position of the next token start, skipping separators.
    fn next_start(&self) -> Option<usize> {
        self.line[self.pos..]
            .iter()
            .position(|&b| !self.is_separator(b))
            .map(|offset| self.pos + offset)
    }

    /// Whether another token remains.
    pub fn has_next(&self) -> bool {
        self.next_start().is_some()
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let line = self.line;
        let start = match self.next_start() {
            Some(start) => start,
            None => {
                self.pos = line.len();
                return None;
            }
        };
        let end = line[start..]
            .iter()
            .position(|&b| self.is_separator(b))
            .map_or(line.len(), |offset| start + offset);
        self.pos = end;
        Some(Token(&line[start..end]))
    }

    /// Bytes not yet consumed, including leading separators.
    pub fn remainder(&self) -> &'a [u8] {
        &self.line[self.pos..]
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
