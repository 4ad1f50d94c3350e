use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for change-set id extraction.
///
/// Every variant maps onto one [`ExtractStatus`], which is the single status
/// a caller of the extraction driver observes.
#[derive(Error, Debug)]
pub enum ChangeIdsError {
    // === Catalog Errors ===
    /// Querying the reference store's schema catalog failed.
    #[error("schema catalog query failed: {detail}")]
    Catalog { detail: String },

    /// The table catalog's parent relationships contain a cycle.
    #[error("table catalog contains a parent cycle through table '{table}'")]
    CatalogCycle { table: String },

    /// A table names a parent table id that does not exist.
    #[error("table '{table}' references missing parent table id {parent_id}")]
    DanglingParent { table: String, parent_id: i64 },

    // === Change-Set Format Errors ===
    /// Change-set bytes do not follow the session changeset format.
    #[error("malformed changeset at offset {offset}: {detail}")]
    ChangesetCorrupt { offset: usize, detail: String },

    /// A legacy (pre-schema) table row lacks the key column it is read by.
    #[error("legacy table '{table}' row is malformed: {detail}")]
    LegacyRowMalformed { table: String, detail: String },

    /// The change-set modifies the schema catalog itself.
    #[error("changeset modifies schema table '{table}'")]
    SchemaChange { table: String },

    // === I/O Errors ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Run Control ===
    /// The run was cancelled between two change-set files.
    #[error("extraction interrupted")]
    Interrupted,

    /// A configuration value is unusable.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// Wraps a fatal error with the change-set file (and change) it came from.
    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        change_index: Option<u64>,
        #[source]
        source: Box<ChangeIdsError>,
    },

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Status codes reported by a change-set extraction run.
///
/// Numeric values follow the SQLite result code of the closest condition
/// (`SQLITE_ERROR`, `SQLITE_FORMAT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExtractStatus {
    /// Every change-set was processed.
    Success = 0,
    /// The reference store could not be queried.
    SqliteError = 1,
    /// Internal logic error.
    Internal = 2,
    /// The run was cancelled.
    Interrupted = 9,
    /// A change-set file could not be read.
    IoError = 10,
    /// The change-set touches the schema catalog.
    SchemaChanged = 17,
    /// Configuration rejected.
    InvalidConfig = 21,
    /// Change-set bytes or a legacy row are malformed.
    UnknownFormat = 24,
}

impl ChangeIdsError {
    /// Map this error to the run status a caller observes.
    #[allow(clippy::match_same_arms)]
    pub fn status(&self) -> ExtractStatus {
        match self {
            Self::Catalog { .. } | Self::CatalogCycle { .. } | Self::DanglingParent { .. } => {
                ExtractStatus::SqliteError
            }
            Self::ChangesetCorrupt { .. } | Self::LegacyRowMalformed { .. } => {
                ExtractStatus::UnknownFormat
            }
            Self::SchemaChange { .. } => ExtractStatus::SchemaChanged,
            Self::Io(_) => ExtractStatus::IoError,
            Self::Interrupted => ExtractStatus::Interrupted,
            Self::InvalidConfig { .. } => ExtractStatus::InvalidConfig,
            Self::InFile { source, .. } => source.status(),
            Self::Internal(_) => ExtractStatus::Internal,
        }
    }

    /// Whether the error stems from malformed input bytes.
    pub fn is_format_error(&self) -> bool {
        self.status() == ExtractStatus::UnknownFormat
    }

    /// The innermost error, skipping any file-location wrappers.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::InFile { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Wrap this error with the change-set file it occurred in.
    ///
    /// Errors that already carry a location are returned unchanged.
    #[must_use]
    pub fn in_file(self, path: impl Into<PathBuf>, change_index: Option<u64>) -> Self {
        match self {
            located @ Self::InFile { .. } => located,
            other => Self::InFile {
                path: path.into(),
                change_index,
                source: Box::new(other),
            },
        }
    }

    /// Create a catalog error.
    pub fn catalog(detail: impl Into<String>) -> Self {
        Self::Catalog {
            detail: detail.into(),
        }
    }

    /// Create a changeset-format error at a byte offset.
    pub fn corrupt(offset: usize, detail: impl Into<String>) -> Self {
        Self::ChangesetCorrupt {
            offset,
            detail: detail.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `ChangeIdsError`.
pub type Result<T> = std::result::Result<T, ChangeIdsError>;
