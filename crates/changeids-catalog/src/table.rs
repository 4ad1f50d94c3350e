//! Rows of the `ec_Table` catalog table.

use changeids_types::{ClassId, TableId};
use serde::{Deserialize, Serialize};

/// `ec_Table.Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TableType {
    Primary = 0,
    /// Holds the extra columns of a subclass; shares its parent's row ids.
    Joined = 1,
    Existing = 2,
    /// Holds columns that did not fit in the parent table.
    Overflow = 3,
    Virtual = 4,
}

impl TableType {
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Primary),
            1 => Some(Self::Joined),
            2 => Some(Self::Existing),
            3 => Some(Self::Overflow),
            4 => Some(Self::Virtual),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Whether a row in this table is the primary row of its instance.
    ///
    /// Joined and overflow rows always accompany a row in their parent table.
    #[must_use]
    pub const fn is_primary(self) -> bool {
        !matches!(self, Self::Joined | Self::Overflow)
    }
}

/// One catalog table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: TableId,
    pub parent_id: Option<TableId>,
    pub name: String,
    pub table_type: TableType,
    pub exclusive_root_class_id: Option<ClassId>,
}

impl TableRow {
    /// A top-level primary table.
    #[must_use]
    pub fn primary(id: u64, name: impl Into<String>, root_class: Option<u64>) -> Self {
        Self {
            id: TableId::new(id),
            parent_id: None,
            name: name.into(),
            table_type: TableType::Primary,
            exclusive_root_class_id: root_class.map(ClassId::new),
        }
    }

    /// A table hanging off `parent` (joined or overflow).
    #[must_use]
    pub fn child(id: u64, name: impl Into<String>, parent: u64, table_type: TableType) -> Self {
        Self {
            id: TableId::new(id),
            parent_id: Some(TableId::new(parent)),
            name: name.into(),
            table_type,
            exclusive_root_class_id: None,
        }
    }
}
