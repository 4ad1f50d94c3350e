use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-row facts the row-change iterator derives from the catalog.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RowFlags: u8 {
        /// The change was recorded as an indirect change (trigger, FK action).
        const INDIRECT = 0b0000_0001;
        /// The table is part of the persisted, mapped schema.
        const MAPPED = 0b0000_0010;
        /// The table is the primary table of its logical row.
        const PRIMARY_TABLE = 0b0000_0100;
    }
}
