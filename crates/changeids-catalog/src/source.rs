//! Where catalog metadata comes from.

use changeids_error::Result;
use changeids_types::ClassId;
use hashbrown::HashMap;

use crate::table::TableRow;

/// Read-only access to the ECDb system catalog.
pub trait CatalogSource {
    /// Every row of `ec_Table`.
    fn table_rows(&self) -> Result<Vec<TableRow>>;

    /// Id of class `class` in schema `schema`, matched case-insensitively.
    fn class_id(&self, schema: &str, class: &str) -> Result<Option<ClassId>>;
}

/// Catalog assembled in memory, for tooling and tests that have no store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    tables: Vec<TableRow>,
    classes: HashMap<(String, String), ClassId>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, row: TableRow) -> Self {
        self.tables.push(row);
        self
    }

    pub fn with_class(mut self, schema: &str, class: &str, id: u64) -> Self {
        self.classes.insert(
            (schema.to_ascii_lowercase(), class.to_ascii_lowercase()),
            ClassId::new(id),
        );
        self
    }
}

impl CatalogSource for InMemoryCatalog {
    fn table_rows(&self) -> Result<Vec<TableRow>> {
        Ok(self.tables.clone())
    }

    fn class_id(&self, schema: &str, class: &str) -> Result<Option<ClassId>> {
        Ok(self
            .classes
            .get(&(schema.to_ascii_lowercase(), class.to_ascii_lowercase()))
            .copied())
    }
}
