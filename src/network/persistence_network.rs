use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{debug, error, info, warn};

use crate::configuration::config::NetworkConfig;
use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::{ConfigError, NetworkError, StorageError};
use crate::filter::data_source_filter::DataSourceFilter;
use crate::filter::key::{IntoKey, Key};
use crate::storage::factory::DataSourceFactory;
use crate::storage::storage_trait::DataSource;
use crate::storage::types::ConnectionUri;

type ConnectionCache = HashMap<ConnectionUri, Box<dyn DataSource>>;

/// A group of data sources acting as a single hierarchical key-value store.
///
/// The filter decides which connection owns each key. Connections are opened
/// the first time a key routes to them and stay open until the network is
/// dropped, so every operation on a given URI sees the same backend instance.
///
/// # Fields Overview
///
/// - `filter`: immutable routing rules, built once at construction
/// - `factory`: scheme to backend constructor table
/// - `options`: handed to every backend constructor
/// - `connections`: lazily populated cache, guarded by the router-wide lock
pub struct PersistenceNetwork {
    filter: DataSourceFilter,
    factory: FactoryRef,
    options: ConnectionOptions,
    connections: Mutex<ConnectionCache>,
}

enum FactoryRef {
    Global(&'static DataSourceFactory),
    Owned(DataSourceFactory),
}

impl FactoryRef {
    fn get(&self) -> &DataSourceFactory {
        match self {
            FactoryRef::Global(f) => f,
            FactoryRef::Owned(f) => f,
        }
    }
}

impl PersistenceNetwork {
    /// Builds a network from filter configuration text. `default_uri` serves
    /// every key no rule matches, unless the configuration has a `**` rule.
    pub fn new(configuration: &str, default_uri: &str, options: ConnectionOptions) -> Result<Self, ConfigError> {
        let filter = DataSourceFilter::new(configuration, default_uri)?;
        info!(
            "Persistence network ready with {} filter rule(s), working directory {}",
            filter.rules().len(),
            options.working_directory.display()
        );
        Ok(Self {
            filter,
            factory: FactoryRef::Global(DataSourceFactory::global()),
            options,
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// Same as [`PersistenceNetwork::new`], reading the filter configuration from a file.
    pub fn from_file<P: AsRef<Path>>(
        configuration: P,
        default_uri: &str,
        options: ConnectionOptions,
    ) -> Result<Self, ConfigError> {
        let path = configuration.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read filter configuration {}: {}", path.display(), e);
            ConfigError::IoError(e)
        })?;
        Self::new(&text, default_uri, options)
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self, ConfigError> {
        let rules = config.filter_text()?;
        Self::new(&rules, &config.default_uri, config.connection_options())
    }

    /// Replaces the backend table, e.g. to register extra schemes.
    pub fn with_factory(mut self, factory: DataSourceFactory) -> Self {
        self.factory = FactoryRef::Owned(factory);
        self
    }

    pub fn filter(&self) -> &DataSourceFilter {
        &self.filter
    }

    /// The connection that owns `key`.
    pub fn resolve<K: IntoKey>(&self, key: K) -> Result<ConnectionUri, NetworkError> {
        Ok(self.filter.resolve(&key.into_key()?))
    }

    /// Number of backends opened so far.
    pub fn open_connections(&self) -> usize {
        self.lock().len()
    }

    /// Returns the value for this key, or `None` if it is not set.
    pub fn get<K: IntoKey>(&self, key: K) -> Result<Option<String>, NetworkError> {
        let key = key.into_key()?;
        let mut connections = self.lock();
        self.get_locked(&mut connections, &key)
    }

    /// Sets the value for this key and returns `true` if the stored value changed.
    pub fn set<K: IntoKey>(&self, key: K, value: &str) -> Result<bool, NetworkError> {
        let key = key.into_key()?;
        let mut connections = self.lock();
        let source = self.data_source(&mut connections, &key)?;
        let changed = source.set(&key, value)?;
        debug!("set {} (changed: {})", key, changed);
        Ok(changed)
    }

    /// True if a `get` of this key would return a value.
    pub fn has_key<K: IntoKey>(&self, key: K) -> Result<bool, NetworkError> {
        let key = key.into_key()?;
        let mut connections = self.lock();
        let source = self.data_source(&mut connections, &key)?;
        Ok(source.has_key(&key)?)
    }

    /// Removes the key entirely. Clearing a missing key is not an error.
    pub fn clear_key<K: IntoKey>(&self, key: K) -> Result<(), NetworkError> {
        let key = key.into_key()?;
        let mut connections = self.lock();
        let source = self.data_source(&mut connections, &key)?;
        source.clear_key(&key)?;
        debug!("cleared {}", key);
        Ok(())
    }

    /// Every key and value at or below `namespace`.
    ///
    /// Candidate backends only say which keys they hold; each value is then
    /// read from whichever backend the filter routes that key to, so a stale
    /// copy left in a backend that no longer owns the key is never returned.
    pub fn get_namespace<K: IntoKey>(&self, namespace: K) -> Result<BTreeMap<Key, String>, NetworkError> {
        let namespace = namespace.into_key()?;
        let uris = self.filter.resolve_all(&namespace)?;
        let mut connections = self.lock();

        let mut keys: BTreeSet<Key> = BTreeSet::new();
        for uri in &uris {
            let source = self.connection(&mut connections, uri)?;
            keys.extend(source.get_namespace(&namespace)?);
        }

        let mut values = BTreeMap::new();
        for key in keys {
            if let Some(value) = self.get_locked(&mut connections, &key)? {
                values.insert(key, value);
            }
        }
        debug!(
            "namespace {} resolved to {} value(s) across {} connection(s)",
            namespace,
            values.len(),
            uris.len()
        );
        Ok(values)
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionCache> {
        // Entries are inserted only after construction succeeded.
        self.connections.lock().unwrap_or_else(|poisoned| {
            warn!("Connection cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn get_locked(&self, connections: &mut ConnectionCache, key: &Key) -> Result<Option<String>, NetworkError> {
        let source = self.data_source(connections, key)?;
        Ok(source.get(key, false)?)
    }

    fn data_source<'a>(
        &self,
        connections: &'a mut ConnectionCache,
        key: &Key,
    ) -> Result<&'a mut Box<dyn DataSource>, StorageError> {
        let uri = self.filter.resolve(key);
        debug!("{} routes to {}", key, uri);
        self.connection(connections, &uri)
    }

    fn connection<'a>(
        &self,
        connections: &'a mut ConnectionCache,
        uri: &ConnectionUri,
    ) -> Result<&'a mut Box<dyn DataSource>, StorageError> {
        match connections.entry(uri.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let source = self.factory.get().create(uri, &self.options)?;
                Ok(entry.insert(source))
            }
        }
    }
}
