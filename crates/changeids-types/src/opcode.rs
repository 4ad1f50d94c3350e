//! Row opcodes and the net-opcode merge algebra.
//!
//! Successive operations on the same id fold into a single net opcode:
//!
//! | existing | new    | result  |
//! |----------|--------|---------|
//! | absent   | X      | X       |
//! | Insert   | Insert | Insert  |
//! | Insert   | Update | Insert  |
//! | Insert   | Delete | removed |
//! | Update   | Insert | Insert  |
//! | Update   | Update | Update  |
//! | Update   | Delete | Delete  |
//! | Delete   | Insert | Update  |
//! | Delete   | Update | Update  |
//! | Delete   | Delete | Delete  |
//!
//! Delete followed by Insert nets to Update: the id existed before the
//! observed window and exists after it.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use serde::{Deserialize, Serialize};

/// `SQLITE_INSERT` from `sqlite3.h`.
pub const SQLITE_INSERT: u8 = 18;
/// `SQLITE_UPDATE` from `sqlite3.h`.
pub const SQLITE_UPDATE: u8 = 23;
/// `SQLITE_DELETE` from `sqlite3.h`.
pub const SQLITE_DELETE: u8 = 9;

/// Row-level operation recorded in a change-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbOpcode {
    Insert,
    Update,
    Delete,
}

impl DbOpcode {
    pub const ALL: [Self; 3] = [Self::Insert, Self::Update, Self::Delete];

    /// Decode the SQLite authorizer/session opcode byte.
    #[must_use]
    pub const fn from_sqlite_code(code: u8) -> Option<Self> {
        match code {
            SQLITE_INSERT => Some(Self::Insert),
            SQLITE_UPDATE => Some(Self::Update),
            SQLITE_DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    #[must_use]
    pub const fn sqlite_code(self) -> u8 {
        match self {
            Self::Insert => SQLITE_INSERT,
            Self::Update => SQLITE_UPDATE,
            Self::Delete => SQLITE_DELETE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for DbOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold `new` into the opcode already recorded for an id.
///
/// `None` as a result means the entry must be removed (insert then delete).
#[must_use]
pub const fn merge_opcode(existing: Option<DbOpcode>, new: DbOpcode) -> Option<DbOpcode> {
    use DbOpcode::{Delete, Insert, Update};
    match (existing, new) {
        (None, op) => Some(op),
        (Some(Insert), Insert | Update) => Some(Insert),
        (Some(Insert), Delete) => None,
        (Some(Update), Insert) => Some(Insert),
        (Some(Update), Update) => Some(Update),
        (Some(Update), Delete) => Some(Delete),
        (Some(Delete), Insert | Update) => Some(Update),
        (Some(Delete), Delete) => Some(Delete),
    }
}

/// Net opcode per id for one category.
pub type OpMap<K> = BTreeMap<K, DbOpcode>;

/// Merge one observed operation into an op-map.
pub fn record_op<K: Ord>(map: &mut OpMap<K>, id: K, op: DbOpcode) {
    match map.entry(id) {
        Entry::Vacant(slot) => {
            slot.insert(op);
        }
        Entry::Occupied(mut slot) => match merge_opcode(Some(*slot.get()), op) {
            Some(net) => {
                slot.insert(net);
            }
            None => {
                slot.remove();
            }
        },
    }
}
