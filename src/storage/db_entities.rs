//! SeaORM entity model used by the database storage backend.
//!
//! Maps to the single `persistence` table created by `database_storage`:
//! one row per stored key, the key kept in its dotted string form.

use sea_orm::entity::prelude::*;

/// Persistence table entity model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "persistence")]
pub struct Model {
    /// Dotted key, e.g. `players.alice.home`
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Stored value
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
