//! Error taxonomy shared by the filter engine, the backends and the network.

pub mod types;

pub use types::{
    ConfigError, KeyError, NetworkError, StorageError, UnresolvedCaptureError,
};
