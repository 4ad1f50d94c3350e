//! Resolved, read-only view of the catalog used while classifying rows.

use changeids_error::Result;
use changeids_types::{ClassId, RootClass, TableId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::roots::TableArena;
use crate::source::CatalogSource;
use crate::table::TableType;

/// Schema and class names of the six category root classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryClassNames {
    pub schema: String,
    pub element: String,
    pub unique_aspect: String,
    pub multi_aspect: String,
    pub model: String,
    pub element_refers_to_elements: String,
    pub code_spec: String,
}

impl Default for CategoryClassNames {
    fn default() -> Self {
        Self {
            schema: "BisCore".to_owned(),
            element: "Element".to_owned(),
            unique_aspect: "ElementUniqueAspect".to_owned(),
            multi_aspect: "ElementMultiAspect".to_owned(),
            model: "Model".to_owned(),
            element_refers_to_elements: "ElementRefersToElements".to_owned(),
            code_spec: "CodeSpec".to_owned(),
        }
    }
}

impl CategoryClassNames {
    #[must_use]
    pub fn class_name(&self, root: RootClass) -> &str {
        match root {
            RootClass::Element => &self.element,
            RootClass::UniqueAspect => &self.unique_aspect,
            RootClass::MultiAspect => &self.multi_aspect,
            RootClass::Model => &self.model,
            RootClass::ElementRefersToElements => &self.element_refers_to_elements,
            RootClass::CodeSpec => &self.code_spec,
        }
    }
}

/// Class ids of the category root classes in one store.
///
/// A class missing from the store stays `None` and simply never matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryClassIds {
    ids: [Option<ClassId>; RootClass::ALL.len()],
}

impl CategoryClassIds {
    pub fn load<S: CatalogSource + ?Sized>(source: &S, names: &CategoryClassNames) -> Result<Self> {
        let mut ids = Self::default();
        for root in RootClass::ALL {
            let class = names.class_name(root);
            let id = source.class_id(&names.schema, class)?;
            if id.is_none() {
                warn!(schema = %names.schema, class, "category class not found in catalog");
            }
            ids.set(root, id);
        }
        Ok(ids)
    }

    pub fn set(&mut self, root: RootClass, id: Option<ClassId>) {
        self.ids[root as usize] = id;
    }

    #[must_use]
    pub fn get(&self, root: RootClass) -> Option<ClassId> {
        self.ids[root as usize]
    }

    /// Which category root `class_id` is, if any.
    #[must_use]
    pub fn root_class(&self, class_id: ClassId) -> Option<RootClass> {
        RootClass::ALL
            .into_iter()
            .find(|root| self.get(*root) == Some(class_id))
    }
}

/// What the catalog says about one physical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInfo {
    pub id: TableId,
    pub table_type: TableType,
    /// Exclusive root class of the table's topmost ancestor.
    pub root_class_id: Option<ClassId>,
}

impl TableInfo {
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.table_type.is_primary()
    }
}

/// Catalog state computed once per run.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: HashMap<String, TableInfo>,
    classes: CategoryClassIds,
}

impl SchemaCatalog {
    /// Read every table and the category class ids from `source`.
    pub fn load<S: CatalogSource + ?Sized>(source: &S, names: &CategoryClassNames) -> Result<Self> {
        let classes = CategoryClassIds::load(source, names)?;
        let catalog = Self::from_arena(&TableArena::build(source.table_rows()?)?, classes)?;
        info!(
            tables = catalog.tables.len(),
            rooted = catalog.rooted_count(),
            "schema catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_arena(arena: &TableArena, classes: CategoryClassIds) -> Result<Self> {
        let roots = arena.root_class_ids()?;
        let tables = arena
            .rows()
            .iter()
            .zip(roots)
            .map(|(row, root_class_id)| {
                let info = TableInfo {
                    id: row.id,
                    table_type: row.table_type,
                    root_class_id,
                };
                (row.name.clone(), info)
            })
            .collect::<HashMap<_, _>>();
        if tables.len() != arena.len() {
            debug!(
                rows = arena.len(),
                names = tables.len(),
                "catalog holds repeated table names; later rows win"
            );
        }
        Ok(Self { tables, classes })
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    /// Whether `name` is a table of the persisted schema.
    #[must_use]
    pub fn is_mapped(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    #[must_use]
    pub fn is_primary_table(&self, name: &str) -> bool {
        self.table(name).is_some_and(TableInfo::is_primary)
    }

    #[must_use]
    pub fn root_class_id(&self, name: &str) -> Option<ClassId> {
        self.table(name).and_then(|info| info.root_class_id)
    }

    #[must_use]
    pub const fn classes(&self) -> &CategoryClassIds {
        &self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn rooted_count(&self) -> usize {
        self.tables
            .values()
            .filter(|info| info.root_class_id.is_some())
            .count()
    }
}
