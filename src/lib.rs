pub mod configuration;
pub use configuration::{ConnectionOptions, NetworkConfig};

pub mod error_handling;
pub use error_handling::*;

pub mod filter;
pub use filter::{IntoKey, Key};

pub mod network;
pub use network::PersistenceNetwork;

pub mod storage;
