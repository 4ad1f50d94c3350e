//! Tables outside the mapped schema that still carry change-notified
//! instances. Rules are consulted in order and the first match wins.

use changeids_error::{ChangeIdsError, Result};
use changeids_types::{EntityCategory, SqliteValue};

use crate::iter::RowEntry;

/// Which tables a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableMatcher {
    /// ASCII case-insensitive equality, like SQLite identifiers.
    Name(String),
}

impl TableMatcher {
    #[must_use]
    pub fn matches(&self, table: &str) -> bool {
        match self {
            Self::Name(name) => name.eq_ignore_ascii_case(table),
        }
    }
}

/// How the instance id is read from a matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Integer primary-key column at a fixed position.
    KeyColumn { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTableRule {
    pub matcher: TableMatcher,
    pub strategy: KeyStrategy,
    pub category: EntityCategory,
}

impl LegacyTableRule {
    /// Font rows: id in column 0.
    #[must_use]
    pub fn font(table: &str) -> Self {
        Self {
            matcher: TableMatcher::Name(table.to_owned()),
            strategy: KeyStrategy::KeyColumn { position: 0 },
            category: EntityCategory::Font,
        }
    }

    #[must_use]
    pub fn matches(&self, table: &str) -> bool {
        self.matcher.matches(table)
    }

    /// Read the instance id; a row without a usable key is malformed.
    pub fn instance_id(&self, entry: &RowEntry) -> Result<u64> {
        match self.strategy {
            KeyStrategy::KeyColumn { position } => {
                let value = entry.key_column_value(position)?;
                match value {
                    SqliteValue::Integer(raw) if *raw > 0 => Ok(*raw as u64),
                    other => Err(ChangeIdsError::LegacyRowMalformed {
                        table: entry.table_name().to_owned(),
                        detail: format!("key column {position} holds {} value", other.type_name()),
                    }),
                }
            }
        }
    }
}

/// First rule matching `table`.
#[must_use]
pub fn find_rule<'r>(rules: &'r [LegacyTableRule], table: &str) -> Option<&'r LegacyTableRule> {
    rules.iter().find(|rule| rule.matches(table))
}
