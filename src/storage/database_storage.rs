use std::path::{Path, PathBuf};

use log::{debug, error, info};
use sea_orm::sea_query::OnConflict;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sea_orm::sqlx::ConnectOptions as _;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Schema, SqlxSqliteConnector,
};

use crate::configuration::types::ConnectionOptions;
use crate::error_handling::types::StorageError;
use crate::filter::key::Key;
use crate::storage::db_entities::{self, Entity as PersistenceEntry};
use crate::storage::storage_trait::DataSource;
use crate::storage::types::{ConnectionUri, DataSourceModifier};

/// SQLite backed storage. Every key is one row of the `persistence` table.
///
/// The public API is synchronous, so the backend drives SeaORM on its own
/// current-thread runtime. It must not be used from inside another Tokio
/// runtime.
pub struct DatabaseStorage {
    uri: ConnectionUri,
    path: PathBuf,
    rt: tokio::runtime::Runtime,
    db: DatabaseConnection,
}

impl DatabaseStorage {
    pub fn new(uri: &ConnectionUri, options: &ConnectionOptions) -> Result<Self, StorageError> {
        if uri.location().trim().is_empty() {
            return Err(StorageError::InvalidUri(format!("{} does not name a database file", uri)));
        }
        let path = options.resolve_path(uri.location());
        let read_only = uri.has_modifier(DataSourceModifier::ReadOnly);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        if !read_only {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    StorageError::WriteFailed(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        // Opened by file name, so the location never goes through URL parsing.
        let connect = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(read_only)
            .create_if_missing(!read_only)
            .disable_statement_logging();

        let db = rt.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(connect)
                .await
                .map_err(|e| {
                    error!("Failed to open database {}: {}", path.display(), e);
                    StorageError::ConnectionFailed(format!("{}: {}", path.display(), e))
                })?;
            let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
            if !read_only {
                let backend = db.get_database_backend();
                let mut create = Schema::new(backend).create_table_from_entity(PersistenceEntry);
                create.if_not_exists();
                db.execute(backend.build(&create)).await.map_err(|e| {
                    error!("Failed to create schema in {}: {}", path.display(), e);
                    StorageError::WriteFailed(e.to_string())
                })?;
            }
            Ok::<_, StorageError>(db)
        })?;
        info!("DatabaseStorage initialized at {}", path.display());

        Ok(Self {
            uri: uri.clone(),
            path,
            rt,
            db,
        })
    }

    pub fn open(uri: &ConnectionUri, options: &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError> {
        Ok(Box::new(Self::new(uri, options)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, key: &Key) -> Result<Option<String>, StorageError> {
        self.rt.block_on(async {
            let row = PersistenceEntry::find_by_id(key.to_string())
                .one(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to read {} from {}: {}", key, self.path.display(), e);
                    StorageError::ReadFailed(e.to_string())
                })?;
            Ok(row.map(|r| r.value))
        })
    }
}

impl Drop for DatabaseStorage {
    fn drop(&mut self) {
        // The pool has to shut down while its runtime is still alive.
        if let Err(e) = self.rt.block_on(self.db.clone().close()) {
            error!("Failed to close database {}: {}", self.path.display(), e);
        }
    }
}

impl DataSource for DatabaseStorage {
    fn get(&mut self, key: &Key, _bypass_cached_view: bool) -> Result<Option<String>, StorageError> {
        self.read(key)
    }

    fn set(&mut self, key: &Key, value: &str) -> Result<bool, StorageError> {
        self.check_writable()?;
        if self.read(key)?.as_deref() == Some(value) {
            return Ok(false);
        }
        let row = db_entities::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
        };
        self.rt.block_on(async {
            PersistenceEntry::insert(row)
                .on_conflict(
                    OnConflict::column(db_entities::Column::Key)
                        .update_column(db_entities::Column::Value)
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to write {} to {}: {}", key, self.path.display(), e);
                    StorageError::WriteFailed(e.to_string())
                })
        })?;
        debug!("Stored {} in {}", key, self.path.display());
        Ok(true)
    }

    fn clear_key(&mut self, key: &Key) -> Result<(), StorageError> {
        self.check_writable()?;
        self.rt.block_on(async {
            PersistenceEntry::delete_by_id(key.to_string())
                .exec(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to delete {} from {}: {}", key, self.path.display(), e);
                    StorageError::WriteFailed(e.to_string())
                })
        })?;
        Ok(())
    }

    fn get_namespace(&mut self, prefix: &Key) -> Result<Vec<Key>, StorageError> {
        let exact = prefix.to_string();
        let below = format!("{}.", exact);
        let rows = self.rt.block_on(async {
            PersistenceEntry::find()
                .filter(
                    Condition::any()
                        .add(db_entities::Column::Key.eq(exact.clone()))
                        .add(db_entities::Column::Key.starts_with(below.clone())),
                )
                .order_by_asc(db_entities::Column::Key)
                .all(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to list {} in {}: {}", prefix, self.path.display(), e);
                    StorageError::ReadFailed(e.to_string())
                })
        })?;
        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let key = Key::parse(&row.key).map_err(|e| {
                StorageError::Corrupted(format!("{}: row {}: {}", self.path.display(), row.key, e))
            })?;
            // LIKE treats '_' and '%' as wildcards.
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn uri(&self) -> &ConnectionUri {
        &self.uri
    }

    fn implicit_modifiers(&self) -> &'static [DataSourceModifier] {
        &[DataSourceModifier::Transient]
    }

    fn invalid_modifiers(&self) -> &'static [DataSourceModifier] {
        &[DataSourceModifier::PrettyPrint]
    }

    fn docs(&self) -> &'static str {
        "SQLite {sqlite://path/to/file.sqlite3} One row per key in the persistence table."
    }
}
