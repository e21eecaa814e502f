//! Data source registry.
//!
//! Maps a connection URI scheme to the constructor of the matching backend.
//! The built-in table is assembled once, on first use, and never changes
//! afterwards.

use std::collections::BTreeMap;

use log::{debug, error, info};
use once_cell::sync::Lazy;

use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::StorageError;
use crate::storage::database_storage::DatabaseStorage;
use crate::storage::file_storage::FileStorage;
use crate::storage::json_storage::JsonStorage;
use crate::storage::memory_storage::MemoryStorage;
use crate::storage::storage_trait::DataSource;
use crate::storage::types::ConnectionUri;

pub type DataSourceConstructor =
    fn(&ConnectionUri, &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError>;

static BUILTIN: Lazy<DataSourceFactory> = Lazy::new(|| {
    DataSourceFactory::builder()
        .register("mem", MemoryStorage::open)
        .register("file", FileStorage::open_file)
        .register("ini", FileStorage::open_file)
        .register("json", JsonStorage::open_json)
        .register("sqlite", DatabaseStorage::open)
        .build()
});

pub struct DataSourceFactory {
    constructors: BTreeMap<String, DataSourceConstructor>,
}

#[derive(Default)]
pub struct DataSourceFactoryBuilder {
    constructors: BTreeMap<String, DataSourceConstructor>,
}

impl DataSourceFactoryBuilder {
    /// Adds (or replaces) the constructor for `scheme`. Schemes are case-insensitive.
    pub fn register(mut self, scheme: &str, constructor: DataSourceConstructor) -> Self {
        self.constructors.insert(scheme.to_ascii_lowercase(), constructor);
        self
    }

    /// Starts from every built-in scheme.
    pub fn with_builtins(mut self) -> Self {
        for (scheme, constructor) in &BUILTIN.constructors {
            self.constructors.entry(scheme.clone()).or_insert(*constructor);
        }
        self
    }

    pub fn build(self) -> DataSourceFactory {
        DataSourceFactory {
            constructors: self.constructors,
        }
    }
}

impl DataSourceFactory {
    pub fn builder() -> DataSourceFactoryBuilder {
        DataSourceFactoryBuilder::default()
    }

    /// The process wide table of built-in backends.
    pub fn global() -> &'static DataSourceFactory {
        &BUILTIN
    }

    pub fn schemes(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.constructors.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Opens a backend for `uri`. Failures are returned as-is, never retried.
    pub fn create(&self, uri: &ConnectionUri, options: &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError> {
        let constructor = self.constructors.get(uri.scheme()).ok_or_else(|| {
            error!("No data source registered for {}", uri);
            StorageError::UnknownScheme(uri.scheme().to_string())
        })?;
        let source = constructor(uri, options)?;
        if let Some(modifier) = uri
            .modifiers()
            .iter()
            .find(|m| source.invalid_modifiers().contains(*m))
        {
            error!("Modifier {} cannot be used with {}", modifier, uri);
            return Err(StorageError::UnsupportedModifier {
                uri: uri.to_string(),
                modifier: modifier.to_string(),
            });
        }
        info!("Opened data source {}", uri);
        debug!("{}", source.docs());
        Ok(source)
    }
}
