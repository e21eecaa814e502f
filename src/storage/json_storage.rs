use std::path::Path;

use log::error;
use serde_json::{Map, Value};

use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::StorageError;
use crate::filter::key::Key;
use crate::storage::document_storage::{DocumentFormat, DocumentStorage, Model};
use crate::storage::storage_trait::DataSource;
use crate::storage::types::ConnectionUri;

/// JSON document storage: a single flat object mapping dotted keys to strings.
pub type JsonStorage = DocumentStorage<JsonFormat>;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl JsonStorage {
    pub fn open_json(uri: &ConnectionUri, options: &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError> {
        Ok(Box::new(DocumentStorage::open(uri, options, JsonFormat)?))
    }
}

impl DocumentFormat for JsonFormat {
    fn parse(&self, text: &str, origin: &Path) -> Result<Model, StorageError> {
        let mut model = Model::new();
        if text.trim().is_empty() {
            return Ok(model);
        }
        let document: Value = serde_json::from_str(text).map_err(|e| {
            error!("Invalid JSON in {}: {}", origin.display(), e);
            StorageError::Corrupted(format!("{}: {}", origin.display(), e))
        })?;
        let Value::Object(entries) = document else {
            return Err(StorageError::Corrupted(format!(
                "{}: top level value is not an object",
                origin.display()
            )));
        };
        for (raw_key, value) in entries {
            let key = Key::parse(&raw_key).map_err(|e| {
                StorageError::Corrupted(format!("{}: {}", origin.display(), e))
            })?;
            match value {
                Value::String(s) => {
                    model.insert(key, s);
                }
                other => {
                    return Err(StorageError::Corrupted(format!(
                        "{}: value of {} is not a string: {}",
                        origin.display(),
                        raw_key,
                        other
                    )))
                }
            }
        }
        Ok(model)
    }

    fn serialize(&self, model: &Model, pretty: bool) -> Result<String, StorageError> {
        let document: Map<String, Value> = model
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        let document = Value::Object(document);
        let text = if pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        text.map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    fn docs(&self) -> &'static str {
        "JSON {json://path/to/file.json} A flat JSON object of string values."
    }
}
