//! Deciding which output map, if any, a row change belongs to.

use changeids_catalog::SchemaCatalog;
use changeids_error::{ChangeIdsError, Result};
use changeids_types::{DbOpcode, EntityCategory};
use tracing::{debug, error, warn};

use crate::config::{ExtractConfig, SchemaChangePolicy};
use crate::iter::RowEntry;
use crate::legacy::{LegacyTableRule, find_rule};

/// Why a change was not recorded and is not worth a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Unmapped or non-primary table matching no legacy rule.
    OutsideSchema,
    /// Root class is not one of the category classes.
    OtherRootClass,
}

/// Why a change that should have been recorded was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Mapped primary table without an exclusive root class.
    NoRootClass,
    /// First primary-key column is missing or not a valid id.
    InvalidKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Record {
        category: EntityCategory,
        id: u64,
        op: DbOpcode,
    },
    Ignored(IgnoreReason),
    Unresolved(UnresolvedReason),
}

/// Routes row changes using the resolved catalog and the legacy rules.
#[derive(Debug)]
pub struct Classifier<'a> {
    catalog: &'a SchemaCatalog,
    rules: &'a [LegacyTableRule],
    config: &'a ExtractConfig,
}

impl<'a> Classifier<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a SchemaCatalog,
        rules: &'a [LegacyTableRule],
        config: &'a ExtractConfig,
    ) -> Self {
        Self {
            catalog,
            rules,
            config,
        }
    }

    /// Classify one change. Errors abort the run.
    pub fn classify(&self, entry: &RowEntry) -> Result<Classification> {
        let table = entry.table_name();

        if self.config.schema_changes == SchemaChangePolicy::Reject
            && self.config.is_schema_table(table)
        {
            error!(
                table,
                change_index = entry.index(),
                op = %entry.opcode(),
                "changeset modifies the schema catalog"
            );
            return Err(ChangeIdsError::SchemaChange {
                table: table.to_owned(),
            });
        }

        if !entry.is_mapped() || !entry.is_primary_table() {
            let Some(rule) = find_rule(self.rules, table) else {
                return Ok(Classification::Ignored(IgnoreReason::OutsideSchema));
            };
            let id = rule.instance_id(entry).inspect_err(|err| {
                error!(
                    table,
                    change_index = entry.index(),
                    error = %err,
                    "legacy table row cannot be keyed"
                );
            })?;
            return Ok(Classification::Record {
                category: rule.category,
                id,
                op: entry.opcode(),
            });
        }

        let Some(root_class_id) = self.catalog.root_class_id(table) else {
            warn!(
                table,
                change_index = entry.index(),
                "no exclusive root class for mapped table; change skipped"
            );
            return Ok(Classification::Unresolved(UnresolvedReason::NoRootClass));
        };

        let Some(root) = self.catalog.classes().root_class(root_class_id) else {
            debug!(table, root_class = %root_class_id, "root class outside change categories");
            return Ok(Classification::Ignored(IgnoreReason::OtherRootClass));
        };

        let Some(id) = entry.primary_instance_id() else {
            warn!(
                table,
                change_index = entry.index(),
                op = %entry.opcode(),
                "primary key is missing or not a valid id; change skipped"
            );
            return Ok(Classification::Unresolved(UnresolvedReason::InvalidKey));
        };

        Ok(Classification::Record {
            category: root.category(),
            id,
            op: entry.opcode(),
        })
    }
}
