use crate::error_handling::types::StorageError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

static SCHEME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("scheme regex"));

/// Flags prefixed to a connection URI (`readonly:transient:json://...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSourceModifier {
    /// Every mutating call fails.
    ReadOnly,
    /// Reads always go to the backing store, never to the cached model.
    Transient,
    /// Documents are written in a human friendly layout.
    PrettyPrint,
}

impl DataSourceModifier {
    pub const ALL: [DataSourceModifier; 3] = [
        DataSourceModifier::ReadOnly,
        DataSourceModifier::Transient,
        DataSourceModifier::PrettyPrint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataSourceModifier::ReadOnly => "readonly",
            DataSourceModifier::Transient => "transient",
            DataSourceModifier::PrettyPrint => "prettyprint",
        }
    }
}

impl fmt::Display for DataSourceModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DataSourceModifier {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataSourceModifier::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| StorageError::InvalidUri(format!("unknown modifier '{}'", s)))
    }
}

/// A parsed connection URI: `[modifier:]*scheme://location`.
///
/// Equality and hashing use the canonical form, so `Transient:ReadOnly:JSON://x`
/// and `readonly:transient:json://x` name the same connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionUri {
    modifiers: BTreeSet<DataSourceModifier>,
    scheme: String,
    location: String,
}

impl ConnectionUri {
    pub fn parse(text: &str) -> Result<Self, StorageError> {
        let text = text.trim();
        let (head, location) = text
            .split_once("://")
            .ok_or_else(|| StorageError::InvalidUri(format!("'{}' is missing '://'", text)))?;
        let mut parts: Vec<&str> = head.split(':').collect();
        let scheme = parts.pop().unwrap_or_default();
        if !SCHEME_PATTERN.is_match(scheme) {
            return Err(StorageError::InvalidUri(format!(
                "'{}' has an invalid scheme '{}'",
                text, scheme
            )));
        }
        let modifiers = parts
            .into_iter()
            .map(DataSourceModifier::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            modifiers,
            scheme: scheme.to_ascii_lowercase(),
            location: location.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn modifiers(&self) -> &BTreeSet<DataSourceModifier> {
        &self.modifiers
    }

    pub fn has_modifier(&self, modifier: DataSourceModifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Same modifiers and scheme, different location.
    pub fn with_location(&self, location: String) -> ConnectionUri {
        ConnectionUri {
            modifiers: self.modifiers.clone(),
            scheme: self.scheme.clone(),
            location,
        }
    }
}

impl fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}:", modifier)?;
        }
        write!(f, "{}://{}", self.scheme, self.location)
    }
}

impl FromStr for ConnectionUri {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionUri::parse(s)
    }
}
