//! Segment patterns.
//!
//! A pattern is a dot-separated list of matchers: a literal segment, `*`
//! (exactly one segment) or a terminal `**` (any suffix, including the empty
//! one). Every wildcard is also a capture, numbered from 1 in the order it
//! appears.

use crate::error_handling::types::ConfigError;
use crate::filter::key::Key;
use std::fmt;

pub const SINGLE_WILDCARD: &str = "*";
pub const MULTI_WILDCARD: &str = "**";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentMatcher {
    Literal(String),
    Single,
    Multi,
}

impl fmt::Display for SegmentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentMatcher::Literal(s) => write!(f, "{}", s),
            SegmentMatcher::Single => write!(f, "{}", SINGLE_WILDCARD),
            SegmentMatcher::Multi => write!(f, "{}", MULTI_WILDCARD),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    matchers: Vec<SegmentMatcher>,
}

impl Pattern {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConfigError::MalformedPattern("pattern is empty".into()));
        }
        let parts: Vec<&str> = text.split('.').collect();
        let last = parts.len() - 1;
        let mut matchers = Vec::with_capacity(parts.len());
        for (i, part) in parts.into_iter().enumerate() {
            let matcher = match part {
                "" => {
                    return Err(ConfigError::MalformedPattern(format!(
                        "'{}' has an empty segment",
                        text
                    )))
                }
                MULTI_WILDCARD if i != last => {
                    return Err(ConfigError::MalformedPattern(format!(
                        "'{}': '**' is only allowed as the last segment",
                        text
                    )))
                }
                MULTI_WILDCARD => SegmentMatcher::Multi,
                SINGLE_WILDCARD => SegmentMatcher::Single,
                literal if literal.contains('*') => {
                    return Err(ConfigError::MalformedPattern(format!(
                        "'{}': segment '{}' mixes '*' with text",
                        text, literal
                    )))
                }
                literal => SegmentMatcher::Literal(literal.to_string()),
            };
            matchers.push(matcher);
        }
        Ok(Self { matchers })
    }

    pub fn matchers(&self) -> &[SegmentMatcher] {
        &self.matchers
    }

    /// The bare `**` pattern, which matches every key.
    pub fn is_catch_all(&self) -> bool {
        self.matchers == [SegmentMatcher::Multi]
    }

    pub fn capture_count(&self) -> usize {
        self.matchers
            .iter()
            .filter(|m| !matches!(m, SegmentMatcher::Literal(_)))
            .count()
    }

    /// Matches the whole key and returns the capture bindings, or `None`.
    /// A `**` binds the matched suffix joined with `.`.
    pub fn captures(&self, key: &Key) -> Option<Vec<String>> {
        let segments = key.segments();
        let mut captures = Vec::new();
        for (i, matcher) in self.matchers.iter().enumerate() {
            match matcher {
                SegmentMatcher::Literal(literal) => {
                    if segments.get(i) != Some(literal) {
                        return None;
                    }
                }
                SegmentMatcher::Single => captures.push(segments.get(i)?.clone()),
                SegmentMatcher::Multi => {
                    captures.push(segments.get(i..).map(|s| s.join(".")).unwrap_or_default());
                    return Some(captures);
                }
            }
        }
        (segments.len() == self.matchers.len()).then_some(captures)
    }

    pub fn matches(&self, key: &Key) -> bool {
        self.captures(key).is_some()
    }

    /// True when at least one key at or below `prefix` matches this pattern.
    pub fn is_compatible_with(&self, prefix: &Key) -> bool {
        for (i, segment) in prefix.segments().iter().enumerate() {
            match self.matchers.get(i) {
                None => return false,
                Some(SegmentMatcher::Multi) => return true,
                Some(SegmentMatcher::Literal(literal)) if literal != segment => return false,
                Some(_) => {}
            }
        }
        true
    }

    /// Capture bindings that every key below `prefix` shares: a `*` inside
    /// the prefix is bound to the prefix segment, anything else is unknown.
    pub fn static_bindings(&self, prefix: &Key) -> Vec<Option<String>> {
        self.matchers
            .iter()
            .enumerate()
            .filter_map(|(i, matcher)| match matcher {
                SegmentMatcher::Literal(_) => None,
                SegmentMatcher::Single => Some(prefix.segments().get(i).cloned()),
                SegmentMatcher::Multi => Some(None),
            })
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.matchers.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}
