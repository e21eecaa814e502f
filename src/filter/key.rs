//! Hierarchical keys.
//!
//! A `Key` is an ordered, non-empty list of non-empty segments. Callers may
//! hand keys to the network either as dot-delimited strings (`"a.b.c"`) or
//! as segment lists (`["a", "b", "c"]`); both go through [`IntoKey`] and end
//! up as the same value.

use crate::error_handling::types::KeyError;
use std::fmt;
use std::str::FromStr;

pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// Builds a key from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(KeyError::Empty);
        }
        for segment in &segments {
            if segment.is_empty() {
                return Err(KeyError::EmptySegment(segments.join(".")));
            }
            if segment.contains(SEPARATOR) {
                return Err(KeyError::SeparatorInSegment(segment.clone()));
            }
        }
        Ok(Self { segments })
    }

    /// Parses a dot-delimited key such as `players.alice.home`.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        if text.is_empty() {
            return Err(KeyError::Empty);
        }
        Self::from_segments(text.split(SEPARATOR))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a constructed key.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` is `prefix` itself or lives somewhere beneath it.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns a new key with `segment` appended.
    pub fn child(&self, segment: &str) -> Result<Key, KeyError> {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Key::from_segments(segments)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

/// Anything a caller can use to address a storage cell.
pub trait IntoKey {
    fn into_key(self) -> Result<Key, KeyError>;
}

impl IntoKey for Key {
    fn into_key(self) -> Result<Key, KeyError> {
        Ok(self)
    }
}

impl IntoKey for &Key {
    fn into_key(self) -> Result<Key, KeyError> {
        Ok(self.clone())
    }
}

impl IntoKey for &str {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::parse(self)
    }
}

impl IntoKey for String {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::parse(&self)
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::parse(self)
    }
}

impl IntoKey for Vec<String> {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::from_segments(self)
    }
}

impl IntoKey for Vec<&str> {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::from_segments(self)
    }
}

impl IntoKey for &[String] {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::from_segments(self.iter().cloned())
    }
}

impl IntoKey for &[&str] {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::from_segments(self.iter().copied())
    }
}

impl<const N: usize> IntoKey for [&str; N] {
    fn into_key(self) -> Result<Key, KeyError> {
        Key::from_segments(self)
    }
}
