//! Shared machinery for backends that keep their whole data set in one
//! text document (properties files, JSON files).
//!
//! A `DocumentStorage` loads the document into an in-memory model when it is
//! opened, serves reads from that model, and rewrites the whole document on
//! every effective change. The concrete syntax is supplied by a
//! [`DocumentFormat`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use uuid::Uuid;

use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::StorageError;
use crate::filter::key::Key;
use crate::storage::storage_trait::DataSource;
use crate::storage::types::{ConnectionUri, DataSourceModifier};

pub type Model = BTreeMap<Key, String>;

/// Text syntax of a document backend.
pub trait DocumentFormat: Send + 'static {
    /// Parses the full document. `origin` is only used in error messages.
    fn parse(&self, text: &str, origin: &Path) -> Result<Model, StorageError>;

    fn serialize(&self, model: &Model, pretty: bool) -> Result<String, StorageError>;

    fn invalid_modifiers(&self) -> &'static [DataSourceModifier] {
        &[]
    }

    fn docs(&self) -> &'static str;
}

pub struct DocumentStorage<F: DocumentFormat> {
    uri: ConnectionUri,
    path: PathBuf,
    format: F,
    model: Model,
}

impl<F: DocumentFormat> DocumentStorage<F> {
    pub fn open(uri: &ConnectionUri, options: &ConnectionOptions, format: F) -> Result<Self, StorageError> {
        if uri.location().trim().is_empty() {
            return Err(StorageError::InvalidUri(format!("{} does not name a file", uri)));
        }
        let path = options.resolve_path(uri.location());
        let mut storage = Self {
            uri: uri.clone(),
            path,
            format,
            model: Model::new(),
        };

        if storage.path.exists() {
            storage.reload()?;
        } else if !storage.uri.has_modifier(DataSourceModifier::ReadOnly) {
            if let Some(parent) = storage.path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    StorageError::WriteFailed(format!("{}: {}", parent.display(), e))
                })?;
            }
            storage.persist(&storage.model)?;
            info!("Created data file {} for {}", storage.path.display(), storage.uri);
        }
        debug!("Opened {} with {} value(s)", storage.uri, storage.model.len());
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reload(&mut self) -> Result<(), StorageError> {
        if !self.path.exists() {
            self.model.clear();
            return Ok(());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| {
            error!("Failed to read {}: {}", self.path.display(), e);
            StorageError::ReadFailed(format!("{}: {}", self.path.display(), e))
        })?;
        self.model = self.format.parse(&text, &self.path)?;
        Ok(())
    }

    fn refresh(&mut self, bypass_cached_view: bool) -> Result<(), StorageError> {
        if bypass_cached_view || self.uri.has_modifier(DataSourceModifier::Transient) {
            self.reload()?;
        }
        Ok(())
    }

    /// Writes `model` to a sibling temp file and renames it over the target.
    /// Callers only adopt `model` once this succeeds.
    fn persist(&self, model: &Model) -> Result<(), StorageError> {
        let pretty = self.uri.has_modifier(DataSourceModifier::PrettyPrint);
        let text = self.format.serialize(model, pretty)?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
        let mut f = fs::File::create(&tmp).map_err(|e| {
            error!("Failed to create {}: {}", tmp.display(), e);
            StorageError::WriteFailed(format!("{}: {}", tmp.display(), e))
        })?;
        f.write_all(text.as_bytes()).and_then(|_| f.sync_all()).map_err(|e| {
            error!("Failed to write {}: {}", tmp.display(), e);
            let _ = fs::remove_file(&tmp);
            StorageError::WriteFailed(format!("{}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            error!("Failed to replace {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp);
            StorageError::WriteFailed(format!("{}: {}", self.path.display(), e))
        })?;
        debug!("Wrote {} value(s) to {}", model.len(), self.path.display());
        Ok(())
    }
}

impl<F: DocumentFormat> DataSource for DocumentStorage<F> {
    fn get(&mut self, key: &Key, bypass_cached_view: bool) -> Result<Option<String>, StorageError> {
        self.refresh(bypass_cached_view)?;
        Ok(self.model.get(key).cloned())
    }

    fn set(&mut self, key: &Key, value: &str) -> Result<bool, StorageError> {
        self.check_writable()?;
        self.refresh(false)?;
        if self.model.get(key).map(String::as_str) == Some(value) {
            return Ok(false);
        }
        let mut next = self.model.clone();
        next.insert(key.clone(), value.to_string());
        self.persist(&next)?;
        self.model = next;
        Ok(true)
    }

    fn clear_key(&mut self, key: &Key) -> Result<(), StorageError> {
        self.check_writable()?;
        self.refresh(false)?;
        if self.model.contains_key(key) {
            let mut next = self.model.clone();
            next.remove(key);
            self.persist(&next)?;
            self.model = next;
        }
        Ok(())
    }

    fn get_namespace(&mut self, prefix: &Key) -> Result<Vec<Key>, StorageError> {
        self.refresh(false)?;
        Ok(self
            .model
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn uri(&self) -> &ConnectionUri {
        &self.uri
    }

    fn invalid_modifiers(&self) -> &'static [DataSourceModifier] {
        self.format.invalid_modifiers()
    }

    fn docs(&self) -> &'static str {
        self.format.docs()
    }
}
