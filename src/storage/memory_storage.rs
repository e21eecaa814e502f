use std::collections::BTreeMap;

use log::debug;

use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::StorageError;
use crate::filter::key::Key;
use crate::storage::storage_trait::DataSource;
use crate::storage::types::{ConnectionUri, DataSourceModifier};

/// Process-local storage. Every instance owns a private map, so two instances
/// opened on the same URI do not see each other's data.
pub struct MemoryStorage {
    uri: ConnectionUri,
    values: BTreeMap<Key, String>,
}

impl MemoryStorage {
    pub fn new(uri: ConnectionUri) -> Self {
        debug!("MemoryStorage opened for {}", uri);
        Self {
            uri,
            values: BTreeMap::new(),
        }
    }

    pub fn open(uri: &ConnectionUri, _options: &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError> {
        Ok(Box::new(Self::new(uri.clone())))
    }
}

impl DataSource for MemoryStorage {
    fn get(&mut self, key: &Key, _bypass_cached_view: bool) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &Key, value: &str) -> Result<bool, StorageError> {
        self.check_writable()?;
        let previous = self.values.insert(key.clone(), value.to_string());
        Ok(previous.as_deref() != Some(value))
    }

    fn clear_key(&mut self, key: &Key) -> Result<(), StorageError> {
        self.check_writable()?;
        self.values.remove(key);
        Ok(())
    }

    fn get_namespace(&mut self, prefix: &Key) -> Result<Vec<Key>, StorageError> {
        Ok(self
            .values
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn uri(&self) -> &ConnectionUri {
        &self.uri
    }

    fn invalid_modifiers(&self) -> &'static [DataSourceModifier] {
        &[DataSourceModifier::Transient, DataSourceModifier::PrettyPrint]
    }

    fn docs(&self) -> &'static str {
        "Memory {mem://name} Values live only as long as the process."
    }
}
