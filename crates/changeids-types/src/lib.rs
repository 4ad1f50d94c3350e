//! Core type definitions shared by the change-set extraction crates.

pub mod category;
pub mod changed;
pub mod cx;
pub mod flags;
pub mod id;
pub mod opcode;
pub mod value;

pub use category::{EntityCategory, RootClass};
pub use changed::{ChangedInstanceIds, ExtractStats};
pub use cx::Cx;
pub use flags::RowFlags;
pub use id::{AspectId, ClassId, CodeSpecId, ElementId, FontId, ModelId, RelationshipId, TableId};
pub use opcode::{DbOpcode, OpMap, merge_opcode, record_op};
pub use value::{ColumnValue, SqliteValue};
