//! Change-set classification and net-opcode extraction.
//!
//! A run resolves the catalog once, then walks each change-set file in the
//! order given. Every row change is routed to an entity category (or
//! skipped) and folded into that category's net-opcode map.

pub mod classify;
pub mod config;
pub mod extract;
pub mod iter;
pub mod legacy;

pub use classify::{Classification, Classifier, IgnoreReason, UnresolvedReason};
pub use config::{ExtractConfig, SchemaChangePolicy};
pub use extract::{ChangedIdsExtractor, extract_changed_instance_ids};
pub use iter::{ChangeIterator, ChangeSetFile, RowEntry};
pub use legacy::{KeyStrategy, LegacyTableRule, TableMatcher, find_rule};
