//! Strongly typed 64-bit handles.
//!
//! All ids share one representation (an unsigned 64-bit integer where `0`
//! means "invalid"), but each category gets its own type so an element id
//! cannot be recorded in the model map by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Convert a SQLite integer; zero and negative values are not ids.
            #[must_use]
            pub const fn from_sqlite(value: i64) -> Option<Self> {
                if value > 0 {
                    Some(Self(value as u64))
                } else {
                    None
                }
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

define_id!(
    /// Id of a row whose root class is `Element`.
    ElementId
);
define_id!(
    /// Id of a unique or multi aspect row.
    AspectId
);
define_id!(
    /// Id of a row whose root class is `Model`.
    ModelId
);
define_id!(
    /// Id of an element-refers-to-elements link-table row.
    RelationshipId
);
define_id!(
    /// Id of a code specification row.
    CodeSpecId
);
define_id!(
    /// Id of a row in the legacy font table.
    FontId
);
define_id!(
    /// Id of a class in the schema catalog.
    ClassId
);
define_id!(
    /// Id of a table in the schema catalog.
    TableId
);
