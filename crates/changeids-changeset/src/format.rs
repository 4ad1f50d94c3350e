//! Wire constants of the SQLite session changeset/patchset stream.
//!
//! Layout:
//! - table header: `'T'` or `'P'`, varint column count, one primary-key byte
//!   per column (0 = not part of the key, otherwise the 1-based key
//!   position), NUL-terminated table name;
//! - change: opcode byte (`SQLITE_INSERT`, `SQLITE_UPDATE`,
//!   `SQLITE_DELETE`), indirect byte, then one or two records;
//! - record: one value per column (patchset DELETE: key columns only).

use std::sync::Arc;

use smallvec::SmallVec;

/// Marks a changeset table header.
pub const TABLE_HEADER_CHANGESET: u8 = b'T';
/// Marks a patchset table header.
pub const TABLE_HEADER_PATCHSET: u8 = b'P';

/// Column not present in the record.
pub const VALUE_UNDEFINED: u8 = 0x00;
/// 8-byte big-endian signed integer follows.
pub const VALUE_INTEGER: u8 = 0x01;
/// 8-byte big-endian IEEE-754 double follows.
pub const VALUE_FLOAT: u8 = 0x02;
/// Varint length and UTF-8 bytes follow.
pub const VALUE_TEXT: u8 = 0x03;
/// Varint length and raw bytes follow.
pub const VALUE_BLOB: u8 = 0x04;
/// SQL NULL.
pub const VALUE_NULL: u8 = 0x05;

/// Which flavor of stream a table section was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangesetFormat {
    /// Full old and new records (invertible).
    Changeset,
    /// Key-only deletes and single-record updates.
    Patchset,
}

impl ChangesetFormat {
    #[must_use]
    pub const fn header_byte(self) -> u8 {
        match self {
            Self::Changeset => TABLE_HEADER_CHANGESET,
            Self::Patchset => TABLE_HEADER_PATCHSET,
        }
    }

    #[must_use]
    pub const fn from_header_byte(byte: u8) -> Option<Self> {
        match byte {
            TABLE_HEADER_CHANGESET => Some(Self::Changeset),
            TABLE_HEADER_PATCHSET => Some(Self::Patchset),
            _ => None,
        }
    }
}

/// Decoded table header shared by every change that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub name: String,
    pub format: ChangesetFormat,
    pub pk_flags: SmallVec<[u8; 16]>,
}

/// Shared handle to a table header.
pub type TableHeaderRef = Arc<TableHeader>;

impl TableHeader {
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.pk_flags.len()
    }

    #[must_use]
    pub fn is_primary_key_column(&self, column: usize) -> bool {
        self.pk_flags.get(column).is_some_and(|flag| *flag != 0)
    }

    /// Primary-key column indices in key order.
    #[must_use]
    pub fn primary_key_columns(&self) -> SmallVec<[usize; 4]> {
        let mut columns: SmallVec<[usize; 4]> = self
            .pk_flags
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag != 0)
            .map(|(column, _)| column)
            .collect();
        columns.sort_by_key(|column| (self.pk_flags[*column], *column));
        columns
    }

    /// Number of values a patchset DELETE record carries.
    #[must_use]
    pub fn primary_key_count(&self) -> usize {
        self.pk_flags.iter().filter(|flag| **flag != 0).count()
    }
}
