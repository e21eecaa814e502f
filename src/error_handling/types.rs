use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MalformedRule { line: usize, reason: String },
    MalformedPattern(String),
    InvalidUri(String),
    UnknownAlias(String),
    BadCaptureReference(String),
    ConflictingSources(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MalformedRule { line, reason } => {
                write!(f, "Malformed filter rule on line {}: {}", line, reason)
            }
            ConfigError::MalformedPattern(e) => write!(f, "Malformed filter pattern: {}", e),
            ConfigError::InvalidUri(e) => write!(f, "Invalid connection URI: {}", e),
            ConfigError::UnknownAlias(e) => write!(f, "Unknown connection alias: {}", e),
            ConfigError::BadCaptureReference(e) => write!(f, "Bad capture reference: {}", e),
            ConfigError::ConflictingSources(e) => write!(f, "Conflicting configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Failures reported by a backend, or by the factory while building one.
#[derive(Debug)]
pub enum StorageError {
    UnknownScheme(String),
    InvalidUri(String),
    UnsupportedModifier { uri: String, modifier: String },
    ConnectionFailed(String),
    ReadFailed(String),
    WriteFailed(String),
    Corrupted(String),
    ReadOnly(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::UnknownScheme(e) => write!(f, "No data source registered for scheme {}", e),
            StorageError::InvalidUri(e) => write!(f, "Invalid data source URI: {}", e),
            StorageError::UnsupportedModifier { uri, modifier } => {
                write!(f, "Modifier {} is not supported by {}", modifier, uri)
            }
            StorageError::ConnectionFailed(e) => write!(f, "Storage connection failed: {}", e),
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::Corrupted(e) => write!(f, "Stored data is corrupted: {}", e),
            StorageError::ReadOnly(e) => write!(f, "Data source {} is read only", e),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    Empty,
    EmptySegment(String),
    SeparatorInSegment(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Empty => write!(f, "Key must have at least one segment"),
            KeyError::EmptySegment(k) => write!(f, "Key {} has an empty segment", k),
            KeyError::SeparatorInSegment(s) => write!(f, "Key segment {} contains a '.'", s),
        }
    }
}

impl std::error::Error for KeyError {}

/// A namespace query hit a rule whose target needs a wildcard binding the
/// prefix does not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedCaptureError {
    pub namespace: String,
    pub rule: String,
    pub capture: usize,
}

impl fmt::Display for UnresolvedCaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Capture ${} of rule {} cannot be resolved from namespace {}",
            self.capture, self.rule, self.namespace
        )
    }
}

impl std::error::Error for UnresolvedCaptureError {}

#[derive(Debug)]
pub enum NetworkError {
    Config(ConfigError),
    Storage(StorageError),
    InvalidKey(KeyError),
    UnresolvedCapture(UnresolvedCaptureError),
}

impl NetworkError {
    pub fn is_read_only(&self) -> bool {
        matches!(self, NetworkError::Storage(StorageError::ReadOnly(_)))
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Config(e) => write!(f, "Configuration error: {}", e),
            NetworkError::Storage(e) => write!(f, "Storage error: {}", e),
            NetworkError::InvalidKey(e) => write!(f, "Invalid key: {}", e),
            NetworkError::UnresolvedCapture(e) => write!(f, "Unresolved capture: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Config(e) => Some(e),
            NetworkError::Storage(e) => Some(e),
            NetworkError::InvalidKey(e) => Some(e),
            NetworkError::UnresolvedCapture(e) => Some(e),
        }
    }
}

impl From<ConfigError> for NetworkError {
    fn from(err: ConfigError) -> Self {
        NetworkError::Config(err)
    }
}

impl From<StorageError> for NetworkError {
    fn from(err: StorageError) -> Self {
        NetworkError::Storage(err)
    }
}

impl From<KeyError> for NetworkError {
    fn from(err: KeyError) -> Self {
        NetworkError::InvalidKey(err)
    }
}

impl From<UnresolvedCaptureError> for NetworkError {
    fn from(err: UnresolvedCaptureError) -> Self {
        NetworkError::UnresolvedCapture(err)
    }
}
