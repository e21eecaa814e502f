//! Filter engine.
//!
//! Decides which connection owns a key. The configuration is one rule per
//! line, `pattern=connection-uri`, evaluated top to bottom:
//!
//! ```text
//! # players get their own file, one per world
//! $players=json://players.json
//! players.**=$players
//! worlds.*.spawn=file://worlds/$1.db
//! **=sqlite://persistence.sqlite3
//! ```
//!
//! Re-exports:
//! - [`Key`], [`IntoKey`]: caller facing key types.
//! - [`DataSourceFilter`], [`FilterRule`]: the rule engine.
//! - [`Pattern`], [`SegmentMatcher`]: pattern matching over key segments.

pub mod data_source_filter;
pub mod key;
pub mod pattern;
#[cfg(test)]
pub mod tests;

pub use data_source_filter::{DataSourceFilter, FilterRule};
pub use key::{IntoKey, Key};
pub use pattern::{Pattern, SegmentMatcher};
