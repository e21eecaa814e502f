pub mod config;
pub mod types;

pub use config::NetworkConfig;
pub use types::ConnectionOptions;
