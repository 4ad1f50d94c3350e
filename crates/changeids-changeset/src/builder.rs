//! Encoder producing changeset/patchset streams byte-for-byte in the layout
//! `sqlite3session` writes.

use changeids_error::{ChangeIdsError, Result};
use changeids_types::{ColumnValue, DbOpcode, SqliteValue};
use smallvec::SmallVec;

use crate::format::{
    ChangesetFormat, VALUE_BLOB, VALUE_FLOAT, VALUE_INTEGER, VALUE_NULL, VALUE_TEXT,
    VALUE_UNDEFINED,
};
use crate::varint::put_varint;

/// Incremental stream writer.
///
/// Calls chain; the first misuse (wrong record width, change before a table,
/// bad table name) is remembered and reported by [`finish`](Self::finish).
#[derive(Debug)]
pub struct ChangesetBuilder {
    format: ChangesetFormat,
    out: Vec<u8>,
    pk_flags: Option<SmallVec<[u8; 16]>>,
    indirect: bool,
    changes: u64,
    error: Option<ChangeIdsError>,
}

impl ChangesetBuilder {
    #[must_use]
    pub fn new(format: ChangesetFormat) -> Self {
        Self {
            format,
            out: Vec::new(),
            pk_flags: None,
            indirect: false,
            changes: 0,
            error: None,
        }
    }

    /// Start a table section. `pk_flags` has one byte per column.
    pub fn table(&mut self, name: &str, pk_flags: &[u8]) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if name.as_bytes().contains(&0) {
            return self.fail(format!("table name {name:?} contains NUL"));
        }
        if !pk_flags.iter().any(|flag| *flag != 0) {
            return self.fail(format!("table {name} declares no primary-key column"));
        }
        self.out.push(self.format.header_byte());
        put_varint(&mut self.out, pk_flags.len() as u64);
        self.out.extend_from_slice(pk_flags);
        self.out.extend_from_slice(name.as_bytes());
        self.out.push(0);
        self.pk_flags = Some(SmallVec::from_slice(pk_flags));
        self
    }

    /// Indirect flag written on subsequent changes.
    pub fn indirect(&mut self, indirect: bool) -> &mut Self {
        self.indirect = indirect;
        self
    }

    pub fn insert(&mut self, new: &[ColumnValue]) -> &mut Self {
        self.change(DbOpcode::Insert, &[], new)
    }

    pub fn delete(&mut self, old: &[ColumnValue]) -> &mut Self {
        self.change(DbOpcode::Delete, old, &[])
    }

    /// `old` must carry the key columns; `new` leaves unchanged columns `None`.
    pub fn update(&mut self, old: &[ColumnValue], new: &[ColumnValue]) -> &mut Self {
        self.change(DbOpcode::Update, old, new)
    }

    /// Number of changes written so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.changes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes == 0
    }

    /// Consume the builder and return the encoded stream.
    pub fn finish(self) -> Result<Vec<u8>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }

    fn fail(&mut self, detail: String) -> &mut Self {
        self.error = Some(ChangeIdsError::internal(format!("changeset builder: {detail}")));
        self
    }

    fn change(&mut self, op: DbOpcode, old: &[ColumnValue], new: &[ColumnValue]) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let Some(pk_flags) = self.pk_flags.clone() else {
            return self.fail(format!("{op} before any table"));
        };
        let width = pk_flags.len();
        let expect_old = matches!(op, DbOpcode::Delete | DbOpcode::Update);
        let expect_new = matches!(op, DbOpcode::Insert | DbOpcode::Update);
        if (expect_old && old.len() != width) || (expect_new && new.len() != width) {
            return self.fail(format!(
                "{op} record width mismatch: table has {width} columns, got old={} new={}",
                old.len(),
                new.len()
            ));
        }

        self.out.push(op.sqlite_code());
        self.out.push(u8::from(self.indirect));
        match (self.format, op) {
            (_, DbOpcode::Insert) => self.put_record(new.iter()),
            (ChangesetFormat::Changeset, DbOpcode::Delete) => self.put_record(old.iter()),
            (ChangesetFormat::Patchset, DbOpcode::Delete) => {
                let keys = old
                    .iter()
                    .zip(pk_flags.iter())
                    .filter(|(_, flag)| **flag != 0)
                    .map(|(value, _)| value);
                self.put_record(keys);
            }
            (ChangesetFormat::Changeset, DbOpcode::Update) => {
                self.put_record(old.iter());
                self.put_record(new.iter());
            }
            (ChangesetFormat::Patchset, DbOpcode::Update) => {
                let merged: Vec<ColumnValue> = old
                    .iter()
                    .zip(new)
                    .zip(pk_flags.iter())
                    .map(|((old, new), flag)| {
                        if *flag != 0 {
                            old.clone().or_else(|| new.clone())
                        } else {
                            new.clone()
                        }
                    })
                    .collect();
                self.put_record(merged.iter());
            }
        }
        self.changes += 1;
        self
    }

    fn put_record<'v>(&mut self, values: impl Iterator<Item = &'v ColumnValue>) {
        for value in values {
            put_value(&mut self.out, value.as_ref());
        }
    }
}

fn put_value(out: &mut Vec<u8>, value: Option<&SqliteValue>) {
    match value {
        None => out.push(VALUE_UNDEFINED),
        Some(SqliteValue::Null) => out.push(VALUE_NULL),
        Some(SqliteValue::Integer(v)) => {
            out.push(VALUE_INTEGER);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Some(SqliteValue::Float(v)) => {
            out.push(VALUE_FLOAT);
            out.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Some(SqliteValue::Text(v)) => {
            out.push(VALUE_TEXT);
            put_varint(out, v.len() as u64);
            out.extend_from_slice(v.as_bytes());
        }
        Some(SqliteValue::Blob(v)) => {
            out.push(VALUE_BLOB);
            put_varint(out, v.len() as u64);
            out.extend_from_slice(v);
        }
    }
}
