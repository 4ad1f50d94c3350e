//! Net changed instance ids from SQLite session change-sets.
//!
//! Given a store whose ECDb catalog maps tables to entity classes, and an
//! ordered list of change-set files, compute for each entity category the
//! set of changed ids and the net operation (insert, update or delete) that
//! applying all files in order had on each.
//!
//! ```no_run
//! use changeids::{DbOpcode, EntityCategory, extract_changed_instance_ids};
//!
//! # fn main() -> changeids::Result<()> {
//! let store = rusqlite::Connection::open("briefcase.bim")
//!     .map_err(|e| changeids::ChangeIdsError::catalog(e.to_string()))?;
//! let ids = extract_changed_instance_ids(&store, &["0001.cs", "0002.cs"])?;
//! for (id, op) in &ids.elements {
//!     if *op == DbOpcode::Delete {
//!         println!("element {id} deleted");
//!     }
//! }
//! assert!(ids.len_of(EntityCategory::Font) <= ids.len());
//! # Ok(())
//! # }
//! ```
//!
//! Lower layers are reachable for tooling: [`changeset`] decodes and encodes
//! raw streams, [`catalog`] resolves table roots.

pub use changeids_catalog as catalog;
pub use changeids_changeset as changeset;

pub use changeids_catalog::{CatalogSource, InMemoryCatalog, SchemaCatalog, TableRow, TableType};
pub use changeids_core::{
    ChangeIterator, ChangeSetFile, ChangedIdsExtractor, Classification, ExtractConfig,
    LegacyTableRule, RowEntry, SchemaChangePolicy, extract_changed_instance_ids,
};
pub use changeids_error::{ChangeIdsError, ExtractStatus, Result};
pub use changeids_types::{
    AspectId, ChangedInstanceIds, CodeSpecId, Cx, DbOpcode, ElementId, EntityCategory,
    ExtractStats, FontId, ModelId, RelationshipId, RowFlags, SqliteValue, merge_opcode,
};
