//! Codec for SQLite session extension changesets and patchsets.
//!
//! [`ChangesetReader`] walks a stream lazily and yields one [`TableChange`]
//! per row change; [`ChangesetBuilder`] writes the same layout.

pub mod builder;
pub mod format;
pub mod reader;
pub mod varint;

pub use builder::ChangesetBuilder;
pub use format::{ChangesetFormat, TableHeader, TableHeaderRef};
pub use reader::{ChangesetReader, TableChange, decode_all};
