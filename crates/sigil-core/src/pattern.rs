//! Wildcard-tolerant byte-pattern matching.
//!
//! Patterns are written as whitespace-separated two-hex-digit tokens, with
//! `?` or `??` standing for "any byte": `48 8D 0D ?? ?? ?? ??`. A scan walks
//! every candidate start position in the region and compares byte-by-byte,
//! treating wildcards as always matching.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A compiled byte pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Option<u8>>,
    text: String,
}

impl Pattern {
    /// Parse pattern text. Fails on empty patterns and malformed tokens.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        for token in text.split_whitespace() {
            if token == "??" || token == "?" {
                tokens.push(None);
                continue;
            }

            if token.len() != 2 {
                return Err(Error::InvalidPattern(format!(
                    "token '{}' is not a two-digit hex byte or wildcard",
                    token
                )));
            }

            let value = u8::from_str_radix(token, 16).map_err(|e| {
                Error::InvalidPattern(format!("invalid byte token '{}': {}", token, e))
            })?;
            tokens.push(Some(value));
        }

        if tokens.is_empty() {
            return Err(Error::InvalidPattern("pattern is empty".to_string()));
        }

        let text = format_tokens(&tokens);
        Ok(Self { tokens, text })
    }

    /// Build a pattern from raw tokens (`None` = wildcard).
    pub fn from_tokens(tokens: Vec<Option<u8>>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::InvalidPattern("pattern is empty".to_string()));
        }
        let text = format_tokens(&tokens);
        Ok(Self { tokens, text })
    }

    /// Build an exact (wildcard-free) pattern from literal bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_tokens(bytes.iter().map(|b| Some(*b)).collect())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Option<u8>] {
        &self.tokens
    }

    /// Whether the pattern matches at the start of `window`.
    /// `window` must be at least `len()` bytes.
    fn matches_at(&self, window: &[u8]) -> bool {
        self.tokens
            .iter()
            .zip(window)
            .all(|(token, byte)| match token {
                Some(value) => value == byte,
                None => true,
            })
    }

    /// Offset of the first match in `region`, or `PatternNotFound`.
    ///
    /// First-match semantics are the default: target patterns are expected to
    /// be unique in the scanned region. Callers that need to verify
    /// uniqueness use [`Pattern::find_all`] and count.
    pub fn find(&self, region: &[u8]) -> Result<usize> {
        self.find_all(region)
            .next()
            .ok_or_else(|| Error::PatternNotFound(self.text.clone()))
    }

    /// Lazy iterator over all match offsets in `region`.
    ///
    /// The iterator is finite and restartable: calling `find_all` again
    /// re-scans from the beginning and yields the same offsets, as long as
    /// the region is not mutated in between.
    pub fn find_all<'a>(&'a self, region: &'a [u8]) -> Matches<'a> {
        Matches {
            pattern: self,
            region,
            pos: 0,
        }
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn format_tokens(tokens: &[Option<u8>]) -> String {
    tokens
        .iter()
        .map(|token| match token {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Iterator over match offsets, produced by [`Pattern::find_all`].
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    pattern: &'a Pattern,
    region: &'a [u8],
    pos: usize,
}

impl Iterator for Matches<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let pattern_len = self.pattern.len();
        if pattern_len == 0 || self.region.len() < pattern_len {
            return None;
        }

        let last = self.region.len() - pattern_len;
        while self.pos <= last {
            // A concrete leading byte lets memchr skip candidates wholesale.
            let candidate = match self.pattern.tokens[0] {
                Some(first) => {
                    match memchr::memchr(first, &self.region[self.pos..=last]) {
                        Some(found) => self.pos + found,
                        None => return None,
                    }
                }
                None => self.pos,
            };

            self.pos = candidate + 1;
            if self.pattern.matches_at(&self.region[candidate..]) {
                return Some(candidate);
            }
        }

        None
    }
}
