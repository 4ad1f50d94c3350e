//! Forward-only decoder over a changeset or patchset byte stream.

use std::sync::Arc;

use changeids_error::{ChangeIdsError, Result};
use changeids_types::{ColumnValue, DbOpcode, SqliteValue};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::format::{
    ChangesetFormat, TableHeader, TableHeaderRef, VALUE_BLOB, VALUE_FLOAT, VALUE_INTEGER,
    VALUE_NULL, VALUE_TEXT, VALUE_UNDEFINED,
};
use crate::varint::get_varint;

/// One decoded row change.
#[derive(Debug, Clone, PartialEq)]
pub struct TableChange {
    pub table: TableHeaderRef,
    pub op: DbOpcode,
    pub indirect: bool,
    /// Old record: DELETE and changeset UPDATE. Empty otherwise.
    pub old: Vec<ColumnValue>,
    /// New record: INSERT and UPDATE. Empty otherwise.
    pub new: Vec<ColumnValue>,
    /// Zero-based position of this change within the stream.
    pub index: u64,
    /// Byte offset of the opcode byte.
    pub offset: usize,
}

impl TableChange {
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    #[must_use]
    pub fn old_value(&self, column: usize) -> Option<&SqliteValue> {
        self.old.get(column).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn new_value(&self, column: usize) -> Option<&SqliteValue> {
        self.new.get(column).and_then(Option::as_ref)
    }

    /// Value identifying the row in `column`.
    ///
    /// INSERT reads the new record and DELETE the old one. UPDATE reads the
    /// old record and falls back to the new one, which is where a patchset
    /// carries the key.
    #[must_use]
    pub fn key_value(&self, column: usize) -> Option<&SqliteValue> {
        match self.op {
            DbOpcode::Insert => self.new_value(column),
            DbOpcode::Delete => self.old_value(column),
            DbOpcode::Update => self.old_value(column).or_else(|| self.new_value(column)),
        }
    }

    /// Value of the first primary-key column.
    #[must_use]
    pub fn primary_key(&self) -> Option<&SqliteValue> {
        let column = *self.table.primary_key_columns().first()?;
        self.key_value(column)
    }
}

/// Bounds-checked cursor. Every read reports the offset it failed at.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| ChangeIdsError::corrupt(self.pos, format!("truncated {what}")))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                ChangeIdsError::corrupt(
                    self.pos,
                    format!("{what} of {len} bytes overruns the stream"),
                )
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_varint(&mut self, what: &str) -> Result<u64> {
        let (value, len) = get_varint(&self.data[self.pos..])
            .ok_or_else(|| ChangeIdsError::corrupt(self.pos, format!("truncated {what}")))?;
        self.pos += len;
        Ok(value)
    }

    fn read_len(&mut self, what: &str) -> Result<usize> {
        let at = self.pos;
        let raw = self.read_varint(what)?;
        usize::try_from(raw)
            .ok()
            .filter(|len| *len <= self.remaining())
            .ok_or_else(|| {
                ChangeIdsError::corrupt(at, format!("{what} {raw} exceeds remaining bytes"))
            })
    }

    fn read_be8(&mut self, what: &str) -> Result<[u8; 8]> {
        let bytes = self.read_bytes(8, what)?;
        let mut out = [0_u8; 8];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_value(&mut self) -> Result<ColumnValue> {
        let at = self.pos;
        let tag = self.read_u8("value type")?;
        let value = match tag {
            VALUE_UNDEFINED => return Ok(None),
            VALUE_INTEGER => SqliteValue::Integer(i64::from_be_bytes(self.read_be8("integer")?)),
            VALUE_FLOAT => {
                SqliteValue::Float(f64::from_bits(u64::from_be_bytes(self.read_be8("real")?)))
            }
            VALUE_TEXT => {
                let len = self.read_len("text length")?;
                let bytes = self.read_bytes(len, "text")?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| ChangeIdsError::corrupt(at, "text value is not UTF-8"))?;
                SqliteValue::Text(text.to_owned())
            }
            VALUE_BLOB => {
                let len = self.read_len("blob length")?;
                SqliteValue::Blob(self.read_bytes(len, "blob")?.to_vec())
            }
            VALUE_NULL => SqliteValue::Null,
            other => {
                return Err(ChangeIdsError::corrupt(
                    at,
                    format!("unknown value type 0x{other:02x}"),
                ));
            }
        };
        Ok(Some(value))
    }

    fn read_record(&mut self, columns: usize) -> Result<Vec<ColumnValue>> {
        (0..columns).map(|_| self.read_value()).collect()
    }

    /// Patchset DELETE: key values only, spread back over the full width.
    fn read_key_record(&mut self, header: &TableHeader) -> Result<Vec<ColumnValue>> {
        let mut record = vec![None; header.column_count()];
        for (column, slot) in record.iter_mut().enumerate() {
            if header.is_primary_key_column(column) {
                *slot = self.read_value()?;
            }
        }
        Ok(record)
    }

    fn read_table_header(&mut self, format: ChangesetFormat) -> Result<TableHeader> {
        let at = self.pos;
        let columns = self.read_len("column count")?;
        if columns == 0 {
            return Err(ChangeIdsError::corrupt(at, "table header with zero columns"));
        }
        let pk_flags: SmallVec<[u8; 16]> =
            SmallVec::from_slice(self.read_bytes(columns, "primary-key flags")?);

        let name_at = self.pos;
        let rest = &self.data[self.pos..];
        let nul = memchr::memchr(0, rest)
            .ok_or_else(|| ChangeIdsError::corrupt(name_at, "unterminated table name"))?;
        let name = std::str::from_utf8(&rest[..nul])
            .map_err(|_| ChangeIdsError::corrupt(name_at, "table name is not UTF-8"))?
            .to_owned();
        self.pos += nul + 1;

        if !pk_flags.iter().any(|flag| *flag != 0) {
            return Err(ChangeIdsError::corrupt(
                at,
                format!("table {name} has no primary-key column"),
            ));
        }
        Ok(TableHeader {
            name,
            format,
            pk_flags,
        })
    }
}

/// Lazy iterator over the row changes of one stream.
///
/// Changes come out in stream order. After the first error the iterator is
/// exhausted.
pub struct ChangesetReader<'a> {
    cursor: Cursor<'a>,
    table: Option<TableHeaderRef>,
    next_index: u64,
    failed: bool,
}

impl<'a> ChangesetReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor { data, pos: 0 },
            table: None,
            next_index: 0,
            failed: false,
        }
    }

    /// Byte offset of the next unread byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor.pos
    }

    /// Number of changes yielded so far.
    #[must_use]
    pub fn changes_read(&self) -> u64 {
        self.next_index
    }

    /// Header of the table section currently being read.
    #[must_use]
    pub fn current_table(&self) -> Option<&TableHeaderRef> {
        self.table.as_ref()
    }

    fn read_change(&mut self) -> Result<Option<TableChange>> {
        loop {
            if self.cursor.remaining() == 0 {
                return Ok(None);
            }
            let offset = self.cursor.pos;
            let lead = self.cursor.read_u8("change")?;

            if let Some(format) = ChangesetFormat::from_header_byte(lead) {
                let header = self.cursor.read_table_header(format)?;
                debug!(
                    table = %header.name,
                    columns = header.column_count(),
                    offset,
                    ?format,
                    "changeset table section"
                );
                self.table = Some(Arc::new(header));
                continue;
            }

            let op = DbOpcode::from_sqlite_code(lead).ok_or_else(|| {
                ChangeIdsError::corrupt(offset, format!("unknown opcode 0x{lead:02x}"))
            })?;
            let table = self
                .table
                .clone()
                .ok_or_else(|| ChangeIdsError::corrupt(offset, "change before any table header"))?;
            let indirect = self.cursor.read_u8("indirect flag")? != 0;

            let columns = table.column_count();
            let (old, new) = match (table.format, op) {
                (_, DbOpcode::Insert) => (Vec::new(), self.cursor.read_record(columns)?),
                (ChangesetFormat::Changeset, DbOpcode::Delete) => {
                    (self.cursor.read_record(columns)?, Vec::new())
                }
                (ChangesetFormat::Patchset, DbOpcode::Delete) => {
                    (self.cursor.read_key_record(&table)?, Vec::new())
                }
                (ChangesetFormat::Changeset, DbOpcode::Update) => {
                    let old = self.cursor.read_record(columns)?;
                    (old, self.cursor.read_record(columns)?)
                }
                (ChangesetFormat::Patchset, DbOpcode::Update) => {
                    (Vec::new(), self.cursor.read_record(columns)?)
                }
            };

            let index = self.next_index;
            self.next_index += 1;
            trace!(table = %table.name, op = %op, index, offset, "decoded change");
            return Ok(Some(TableChange {
                table,
                op,
                indirect,
                old,
                new,
                index,
                offset,
            }));
        }
    }
}

impl Iterator for ChangesetReader<'_> {
    type Item = Result<TableChange>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_change() {
            Ok(change) => change.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for ChangesetReader<'_> {}

/// Decode a whole stream eagerly.
///
/// # Errors
///
/// Returns [`ChangeIdsError::ChangesetCorrupt`] at the first malformed byte.
pub fn decode_all(data: &[u8]) -> Result<Vec<TableChange>> {
    ChangesetReader::new(data).collect()
}
