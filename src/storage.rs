//! Storage subsystem
//!
//! This module provides the backend contract the persistence network routes
//! to, the registry that opens backends from connection URIs, and the
//! built-in backends.
//!
//! Components:
//! - `storage_trait`: the DataSource trait defining a uniform API.
//! - `types`: connection URIs and modifiers.
//! - `factory`: scheme to constructor registry.
//! - `memory_storage`: process-local map, mostly for tests and scratch data.
//! - `document_storage`: shared model/persist logic for single-document backends.
//! - `file_storage`: properties text file implementation (`file://`, `ini://`).
//! - `json_storage`: flat JSON object implementation (`json://`).
//! - `database_storage`: SQLite implementation using SeaORM (`sqlite://`).
//! - `db_entities`: SeaORM entity model for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod document_storage;
pub mod factory;
pub mod file_storage;
pub mod json_storage;
pub mod memory_storage;
pub mod storage_trait;
pub mod types;

pub use factory::DataSourceFactory;
pub use storage_trait::DataSource;
pub use types::{ConnectionUri, DataSourceModifier};
