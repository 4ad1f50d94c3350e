//! Row-change iteration over one change-set file, annotated with what the
//! catalog knows about each table.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use changeids_catalog::SchemaCatalog;
use changeids_changeset::{ChangesetReader, TableChange, TableHeaderRef};
use changeids_error::{ChangeIdsError, Result};
use changeids_types::{DbOpcode, RowFlags, SqliteValue};
use tracing::{debug, error};

/// A change-set file loaded into memory. The file itself is never modified.
#[derive(Debug, Clone)]
pub struct ChangeSetFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl ChangeSetFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|err| {
            error!(path = %path.display(), error = %err, "cannot read change-set file");
            ChangeIdsError::from(err)
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "change-set file loaded");
        Ok(Self { path, bytes })
    }

    /// Wrap bytes that did not come from disk; `path` only labels errors.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fresh forward-only pass over the file's row changes.
    #[must_use]
    pub fn changes<'a>(&'a self, catalog: &'a SchemaCatalog) -> ChangeIterator<'a> {
        ChangeIterator {
            path: &self.path,
            reader: ChangesetReader::new(&self.bytes),
            catalog,
            last_table: None,
        }
    }
}

/// One row change plus its catalog-derived flags.
#[derive(Debug, Clone)]
pub struct RowEntry {
    change: TableChange,
    flags: RowFlags,
}

impl RowEntry {
    #[must_use]
    pub fn new(change: TableChange, flags: RowFlags) -> Self {
        Self { change, flags }
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        self.change.table_name()
    }

    #[must_use]
    pub const fn opcode(&self) -> DbOpcode {
        self.change.op
    }

    #[must_use]
    pub const fn flags(&self) -> RowFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_indirect(&self) -> bool {
        self.flags.contains(RowFlags::INDIRECT)
    }

    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        self.flags.contains(RowFlags::MAPPED)
    }

    #[must_use]
    pub const fn is_primary_table(&self) -> bool {
        self.flags.contains(RowFlags::PRIMARY_TABLE)
    }

    /// Zero-based index of the change within its file.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.change.index
    }

    #[must_use]
    pub const fn change(&self) -> &TableChange {
        &self.change
    }

    /// Instance id held in the first primary-key column.
    ///
    /// `None` when the column carries no value or the value is not a
    /// positive integer.
    #[must_use]
    pub fn primary_instance_id(&self) -> Option<u64> {
        let raw = self.change.primary_key()?.as_integer()?;
        u64::try_from(raw).ok().filter(|id| *id != 0)
    }

    /// Value of the primary-key column at `position`, read from the same
    /// record [`primary_instance_id`](Self::primary_instance_id) uses.
    pub fn key_column_value(&self, position: usize) -> Result<&SqliteValue> {
        let table = &self.change.table;
        let malformed = |detail: String| ChangeIdsError::LegacyRowMalformed {
            table: table.name.clone(),
            detail,
        };
        if position >= table.column_count() {
            return Err(malformed(format!(
                "no column {position}; table has {} columns",
                table.column_count()
            )));
        }
        if !table.is_primary_key_column(position) {
            return Err(malformed(format!("column {position} is not a primary-key column")));
        }
        self.change.key_value(position).ok_or_else(|| {
            malformed(format!(
                "{} carries no value in column {position}",
                self.opcode()
            ))
        })
    }
}

/// Iterator yielding [`RowEntry`] values in file order.
///
/// Decoding stops at the first malformed change, which is yielded as an
/// error and logged.
pub struct ChangeIterator<'a> {
    path: &'a Path,
    reader: ChangesetReader<'a>,
    catalog: &'a SchemaCatalog,
    last_table: Option<(TableHeaderRef, RowFlags)>,
}

impl ChangeIterator<'_> {
    /// Changes decoded so far; equals the index of a change that failed.
    #[must_use]
    pub fn changes_read(&self) -> u64 {
        self.reader.changes_read()
    }

    fn table_flags(&mut self, table: &TableHeaderRef) -> RowFlags {
        if let Some((cached, flags)) = &self.last_table {
            if Arc::ptr_eq(cached, table) {
                return *flags;
            }
        }
        let mut flags = RowFlags::empty();
        if let Some(info) = self.catalog.table(&table.name) {
            flags |= RowFlags::MAPPED;
            if info.is_primary() {
                flags |= RowFlags::PRIMARY_TABLE;
            }
        }
        self.last_table = Some((Arc::clone(table), flags));
        flags
    }
}

impl Iterator for ChangeIterator<'_> {
    type Item = Result<RowEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next()? {
            Ok(change) => {
                let mut flags = self.table_flags(&change.table);
                flags.set(RowFlags::INDIRECT, change.indirect);
                Some(Ok(RowEntry::new(change, flags)))
            }
            Err(err) => {
                error!(
                    path = %self.path.display(),
                    table = self.reader.current_table().map_or("", |t| t.name.as_str()),
                    change_index = self.reader.changes_read(),
                    stopped_at = self.reader.position(),
                    error = %err,
                    "change-set decoding failed"
                );
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use changeids_catalog::{CategoryClassIds, TableArena, TableRow, TableType};
    use changeids_changeset::{ChangesetBuilder, ChangesetFormat};
    use changeids_types::SqliteValue::{Integer, Text};

    use super::*;

    fn catalog() -> SchemaCatalog {
        let arena = TableArena::build(vec![
            TableRow::primary(1, "bis_Element", Some(0x10)),
            TableRow::child(2, "bis_GeometricElement3d", 1, TableType::Joined),
        ])
        .expect("arena");
        SchemaCatalog::from_arena(&arena, CategoryClassIds::default()).expect("catalog")
    }

    fn entries(bytes: Vec<u8>) -> Vec<RowEntry> {
        let catalog = catalog();
        let file = ChangeSetFile::from_bytes("mem.cs", bytes);
        file.changes(&catalog)
            .collect::<Result<Vec<_>>>()
            .expect("decode")
    }

    #[test]
    fn test_flags_follow_catalog() {
        let mut builder = ChangesetBuilder::new(ChangesetFormat::Changeset);
        builder
            .table("bis_Element", &[1])
            .insert(&[Some(Integer(1))])
            .table("bis_GeometricElement3d", &[1])
            .indirect(true)
            .insert(&[Some(Integer(1))])
            .table("dgn_Font", &[1, 0])
            .insert(&[Some(Integer(3)), Some(Text("Arial".into()))]);
        let rows = entries(builder.finish().expect("encode"));

        assert!(rows[0].is_mapped() && rows[0].is_primary_table() && !rows[0].is_indirect());
        assert!(rows[1].is_mapped() && !rows[1].is_primary_table() && rows[1].is_indirect());
        assert!(!rows[2].is_mapped() && !rows[2].is_primary_table());
    }

    #[test]
    fn test_primary_instance_id_per_opcode() {
        let mut builder = ChangesetBuilder::new(ChangesetFormat::Changeset);
        builder
            .table("bis_Element", &[1, 0])
            .insert(&[Some(Integer(10)), Some(Text("a".into()))])
            .update(&[Some(Integer(11)), Some(Text("a".into()))], &[None, Some(Text("b".into()))])
            .delete(&[Some(Integer(12)), Some(Text("c".into()))]);
        let rows = entries(builder.finish().expect("encode"));

        let ids: Vec<_> = rows.iter().map(RowEntry::primary_instance_id).collect();
        assert_eq!(ids, vec![Some(10), Some(11), Some(12)]);
    }

    #[test]
    fn test_invalid_keys_have_no_instance_id() {
        let mut builder = ChangesetBuilder::new(ChangesetFormat::Changeset);
        builder
            .table("bis_Element", &[1])
            .insert(&[Some(Integer(0))])
            .insert(&[Some(Integer(-4))])
            .insert(&[Some(Text("x".into()))])
            .insert(&[Some(SqliteValue::Null)]);
        let rows = entries(builder.finish().expect("encode"));
        assert!(rows.iter().all(|row| row.primary_instance_id().is_none()));
    }

    #[test]
    fn test_key_column_value_errors() {
        let mut builder = ChangesetBuilder::new(ChangesetFormat::Changeset);
        builder
            .table("dgn_Font", &[0, 1])
            .insert(&[Some(Text("Arial".into())), Some(Integer(3))]);
        let rows = entries(builder.finish().expect("encode"));

        assert_eq!(rows[0].key_column_value(1).expect("pk"), &Integer(3));
        for position in [0, 2] {
            let err = rows[0].key_column_value(position).expect_err("not a key");
            assert!(err.is_format_error(), "{err}");
        }
    }

    #[test]
    fn test_decode_error_stops_iteration() {
        let mut builder = ChangesetBuilder::new(ChangesetFormat::Changeset);
        builder.table("bis_Element", &[1]).insert(&[Some(Integer(1))]);
        let mut bytes = builder.finish().expect("encode");
        bytes.extend_from_slice(&[23, 0, 0x07]);

        let catalog = catalog();
        let file = ChangeSetFile::from_bytes("bad.cs", bytes);
        let mut iter = file.changes(&catalog);
        assert!(iter.next().expect("first").is_ok());
        assert!(iter.next().expect("second").is_err());
        assert_eq!(iter.changes_read(), 1);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ChangeSetFile::open(dir.path().join("nope.cs")).expect_err("missing");
        assert!(matches!(err, ChangeIdsError::Io(_)));
    }
}
