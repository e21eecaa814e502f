//! The persistence network: routes every key to the data source the filter
//! assigns it and caches the opened data sources for the life of the network.

#[cfg(test)]
pub mod integration_tests;
pub mod persistence_network;

pub use persistence_network::PersistenceNetwork;
