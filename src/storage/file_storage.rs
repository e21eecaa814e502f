use std::path::Path;

use log::error;

use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::StorageError;
use crate::filter::key::Key;
use crate::storage::document_storage::{DocumentFormat, DocumentStorage, Model};
use crate::storage::storage_trait::DataSource;
use crate::storage::types::{ConnectionUri, DataSourceModifier};

/// Properties file storage: one `key=value` pair per line.
pub type FileStorage = DocumentStorage<PropertiesFormat>;

/// Simple KV text format. `#` starts a comment line; backslash escapes
/// `\\`, `\n`, `\r`, `\=` and a leading `\#`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertiesFormat;

impl FileStorage {
    pub fn open_file(uri: &ConnectionUri, options: &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError> {
        Ok(Box::new(DocumentStorage::open(uri, options, PropertiesFormat)?))
    }
}

fn escape(text: &str, out: &mut String) {
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '=' => out.push_str("\\="),
            '#' if i == 0 => out.push_str("\\#"),
            _ => out.push(c),
        }
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits at the first `=` that is not escaped.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' => return Some((&line[..i], &line[i + 1..])),
            _ => {}
        }
    }
    None
}

impl DocumentFormat for PropertiesFormat {
    fn parse(&self, text: &str, origin: &Path) -> Result<Model, StorageError> {
        let mut model = Model::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (raw_key, raw_value) = split_pair(line).ok_or_else(|| {
                error!("Missing '=' on line {} of {}", n + 1, origin.display());
                StorageError::Corrupted(format!("{} line {}: missing '='", origin.display(), n + 1))
            })?;
            let key = Key::parse(&unescape(raw_key)).map_err(|e| {
                error!("Invalid key on line {} of {}: {}", n + 1, origin.display(), e);
                StorageError::Corrupted(format!("{} line {}: {}", origin.display(), n + 1, e))
            })?;
            model.insert(key, unescape(raw_value));
        }
        Ok(model)
    }

    fn serialize(&self, model: &Model, _pretty: bool) -> Result<String, StorageError> {
        let mut out = String::new();
        for (key, value) in model {
            escape(&key.to_string(), &mut out);
            out.push('=');
            escape(value, &mut out);
            out.push('\n');
        }
        Ok(out)
    }

    fn invalid_modifiers(&self) -> &'static [DataSourceModifier] {
        &[DataSourceModifier::PrettyPrint]
    }

    fn docs(&self) -> &'static str {
        "Properties {file://path/to/file.db} One key=value pair per line."
    }
}
