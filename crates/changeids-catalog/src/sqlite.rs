//! [`CatalogSource`] over a live SQLite connection.

use changeids_error::{ChangeIdsError, Result};
use changeids_types::{ClassId, TableId};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::error;

use crate::source::CatalogSource;
use crate::table::{TableRow, TableType};

const SELECT_TABLES: &str =
    "SELECT Id, ParentTableId, Name, Type, ExclusiveRootClassId FROM ec_Table ORDER BY Id";

const SELECT_CLASS_ID: &str = "SELECT c.Id FROM ec_Class c \
     JOIN ec_Schema s ON s.Id = c.SchemaId \
     WHERE s.Name = ?1 COLLATE NOCASE AND c.Name = ?2 COLLATE NOCASE";

fn sqlite_error(context: &'static str) -> impl FnOnce(rusqlite::Error) -> ChangeIdsError {
    move |err| {
        error!(context, error = %err, "catalog query failed");
        ChangeIdsError::catalog(format!("{context}: {err}"))
    }
}

fn required_id<T>(raw: i64, convert: fn(i64) -> Option<T>, what: &str) -> Result<T> {
    convert(raw).ok_or_else(|| ChangeIdsError::catalog(format!("invalid {what} {raw}")))
}

fn optional_id<T>(
    raw: Option<i64>,
    convert: fn(i64) -> Option<T>,
    what: &str,
) -> Result<Option<T>> {
    raw.map(|raw| required_id(raw, convert, what)).transpose()
}

struct RawTableRow {
    id: i64,
    parent_id: Option<i64>,
    name: String,
    table_type: i64,
    root_class: Option<i64>,
}

impl RawTableRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            name: row.get(2)?,
            table_type: row.get(3)?,
            root_class: row.get(4)?,
        })
    }

    fn validate(self) -> Result<TableRow> {
        let table_type = TableType::from_code(self.table_type).ok_or_else(|| {
            ChangeIdsError::catalog(format!(
                "table {} has unknown type {}",
                self.name, self.table_type
            ))
        })?;
        Ok(TableRow {
            id: required_id(self.id, TableId::from_sqlite, "ec_Table id")?,
            parent_id: optional_id(self.parent_id, TableId::from_sqlite, "parent table id")?,
            exclusive_root_class_id: optional_id(
                self.root_class,
                ClassId::from_sqlite,
                "exclusive root class id",
            )?,
            name: self.name,
            table_type,
        })
    }
}

impl CatalogSource for Connection {
    fn table_rows(&self) -> Result<Vec<TableRow>> {
        let mut stmt = self
            .prepare(SELECT_TABLES)
            .map_err(sqlite_error("prepare ec_Table query"))?;
        let raw = stmt
            .query_map([], RawTableRow::from_row)
            .map_err(sqlite_error("query ec_Table"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sqlite_error("read ec_Table row"))?;
        raw.into_iter().map(RawTableRow::validate).collect()
    }

    fn class_id(&self, schema: &str, class: &str) -> Result<Option<ClassId>> {
        let raw: Option<i64> = self
            .query_row(SELECT_CLASS_ID, [schema, class], |row| row.get(0))
            .optional()
            .map_err(sqlite_error("query ec_Class"))?;
        optional_id(raw, ClassId::from_sqlite, "ec_Class id")
    }
}
