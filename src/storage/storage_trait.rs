//! Data source trait
//!
//! This module defines the `DataSource` trait, the capability contract every
//! storage backend fulfils so that the persistence network can route keys to
//! it without knowing anything about its storage format.
//!
//! Implementors of this trait are responsible for:
//! - Reading and writing single values
//! - Reporting whether a write actually changed anything
//! - Enumerating their own keys under a namespace
//! - Describing the modifiers they support
//!
//! All methods return a `Result` to handle potential storage errors.

use crate::error_handling::types::StorageError;
use crate::filter::key::Key;
use crate::storage::types::{ConnectionUri, DataSourceModifier};

/// The `DataSource` trait defines the interface for storage backends.
///
/// A data source is bound to exactly one [`ConnectionUri`] for its whole
/// life. It is owned by the network's connection cache, which serializes all
/// calls, so methods take `&mut self`.
pub trait DataSource: Send {
    /// Returns the value stored under `key`, or `None` if unset.
    ///
    /// - `bypass_cached_view` - re-read the backing store instead of serving
    ///   the in-memory model, where the backend keeps one.
    fn get(&mut self, key: &Key, bypass_cached_view: bool) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key` and returns `true` if the stored value changed.
    fn set(&mut self, key: &Key, value: &str) -> Result<bool, StorageError>;

    /// Returns `true` if a `get` of `key` would return a value.
    fn has_key(&mut self, key: &Key) -> Result<bool, StorageError> {
        Ok(self.get(key, false)?.is_some())
    }

    /// Removes `key`. Removing an absent key succeeds.
    fn clear_key(&mut self, key: &Key) -> Result<(), StorageError>;

    /// Lists the keys this data source holds at or below `prefix`.
    fn get_namespace(&mut self, prefix: &Key) -> Result<Vec<Key>, StorageError>;

    /// The connection this data source was opened with.
    fn uri(&self) -> &ConnectionUri;

    /// Modifiers the backend behaves as if they were always present.
    fn implicit_modifiers(&self) -> &'static [DataSourceModifier] {
        &[]
    }

    /// Modifiers that make no sense for this backend; the factory rejects them.
    fn invalid_modifiers(&self) -> &'static [DataSourceModifier] {
        &[]
    }

    /// One line usage documentation, e.g. `JSON {json://path/to/file.json}`.
    fn docs(&self) -> &'static str;

    /// Modifiers in effect: the ones on the URI plus the implicit ones.
    fn modifiers(&self) -> Vec<DataSourceModifier> {
        let mut modifiers: Vec<DataSourceModifier> =
            self.uri().modifiers().iter().copied().collect();
        for implicit in self.implicit_modifiers() {
            if !modifiers.contains(implicit) {
                modifiers.push(*implicit);
            }
        }
        modifiers.sort();
        modifiers
    }

    fn has_modifier(&self, modifier: DataSourceModifier) -> bool {
        self.uri().has_modifier(modifier) || self.implicit_modifiers().contains(&modifier)
    }

    /// Fails with [`StorageError::ReadOnly`] when bound read only.
    fn check_writable(&self) -> Result<(), StorageError> {
        if self.has_modifier(DataSourceModifier::ReadOnly) {
            return Err(StorageError::ReadOnly(self.uri().to_string()));
        }
        Ok(())
    }
}
