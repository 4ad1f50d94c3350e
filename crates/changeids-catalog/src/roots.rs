//! Table-root resolution over the `ec_Table` parent links.
//!
//! Every table inherits the exclusive root class declared on its topmost
//! ancestor. Tables are stored in an index arena and resolved in one pass;
//! each table is visited once no matter how deep its chain is.

use changeids_error::{ChangeIdsError, Result};
use changeids_types::{ClassId, TableId};
use hashbrown::HashMap;
use tracing::debug;

use crate::table::TableRow;

/// Catalog tables indexed by position, with parent links as indices.
#[derive(Debug)]
pub struct TableArena {
    rows: Vec<TableRow>,
    parents: Vec<Option<usize>>,
    by_id: HashMap<TableId, usize>,
}

impl TableArena {
    /// Index `rows`, rejecting duplicate ids and dangling parent links.
    pub fn build(rows: Vec<TableRow>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if by_id.insert(row.id, index).is_some() {
                return Err(ChangeIdsError::catalog(format!(
                    "duplicate ec_Table id {} ({})",
                    row.id, row.name
                )));
            }
        }

        let parents = rows
            .iter()
            .map(|row| match row.parent_id {
                None => Ok(None),
                Some(parent) => by_id.get(&parent).copied().map(Some).ok_or_else(|| {
                    ChangeIdsError::DanglingParent {
                        table: row.name.clone(),
                        parent_id: parent.get() as i64,
                    }
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows,
            parents,
            by_id,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    #[must_use]
    pub fn index_of(&self, id: TableId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Index of the topmost ancestor of every table, in arena order.
    pub fn topmost_ancestors(&self) -> Result<Vec<usize>> {
        let mut resolved: Vec<Option<usize>> = vec![None; self.rows.len()];
        let mut on_path = vec![false; self.rows.len()];
        let mut path = Vec::new();

        for start in 0..self.rows.len() {
            if resolved[start].is_some() {
                continue;
            }
            path.clear();
            let mut current = start;
            let top = loop {
                if let Some(top) = resolved[current] {
                    break top;
                }
                if on_path[current] {
                    return Err(ChangeIdsError::CatalogCycle {
                        table: self.rows[current].name.clone(),
                    });
                }
                on_path[current] = true;
                path.push(current);
                match self.parents[current] {
                    Some(parent) => current = parent,
                    None => break current,
                }
            };
            for &index in &path {
                resolved[index] = Some(top);
                on_path[index] = false;
            }
        }

        resolved
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ChangeIdsError::internal("table left unresolved after arena walk"))
    }

    /// Root class id of every table, in arena order.
    pub fn root_class_ids(&self) -> Result<Vec<Option<ClassId>>> {
        let tops = self.topmost_ancestors()?;
        Ok(self
            .rows
            .iter()
            .zip(tops)
            .map(|(row, top)| {
                let class_id = self.rows[top].exclusive_root_class_id;
                if class_id.is_none() {
                    debug!(
                        table = %row.name,
                        top = %self.rows[top].name,
                        "table has no exclusive root class"
                    );
                }
                class_id
            })
            .collect())
    }

    /// `table name -> root class id` for every table whose topmost ancestor
    /// declares an exclusive root class.
    pub fn resolve_roots(&self) -> Result<HashMap<String, ClassId>> {
        let mut roots = HashMap::with_capacity(self.rows.len());
        for (row, class_id) in self.rows.iter().zip(self.root_class_ids()?) {
            if let Some(class_id) = class_id {
                roots.insert(row.name.clone(), class_id);
            }
        }
        Ok(roots)
    }
}

/// Resolve `rows` straight to a root map.
pub fn resolve_table_roots(rows: Vec<TableRow>) -> Result<HashMap<String, ClassId>> {
    TableArena::build(rows)?.resolve_roots()
}
