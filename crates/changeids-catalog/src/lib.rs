//! ECDb schema catalog access.
//!
//! The catalog answers three questions about a physical table: is it part
//! of the persisted schema, is it the primary table of its rows, and which
//! exclusive root class does its inheritance chain start from.

pub mod roots;
pub mod schema;
pub mod source;
pub mod sqlite;
pub mod table;

pub use roots::{TableArena, resolve_table_roots};
pub use schema::{CategoryClassIds, CategoryClassNames, SchemaCatalog, TableInfo};
pub use source::{CatalogSource, InMemoryCatalog};
pub use table::{TableRow, TableType};
