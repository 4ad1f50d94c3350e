//! Extraction settings, loadable from TOML.
//!
//! ```toml
//! core_schema = "BisCore"
//! font_table = "dgn_Font"
//! schema_changes = "reject"
//! ```
//!
//! Omitted keys keep their defaults.

use std::fs;
use std::path::Path;

use changeids_catalog::CategoryClassNames;
use changeids_error::{ChangeIdsError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::legacy::LegacyTableRule;

/// What to do with a change to a schema catalog table (`ec_*`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaChangePolicy {
    /// Treat it like any other unmapped table.
    #[default]
    Ignore,
    /// Abort the run with `SchemaChanged`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Schema holding the category root classes.
    pub core_schema: String,
    pub element_class: String,
    pub unique_aspect_class: String,
    pub multi_aspect_class: String,
    pub model_class: String,
    pub element_refers_to_elements_class: String,
    pub code_spec_class: String,
    /// Legacy table whose rows are fonts, keyed by its first column.
    pub font_table: String,
    /// Name prefix of the schema catalog tables.
    pub schema_table_prefix: String,
    pub schema_changes: SchemaChangePolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        let names = CategoryClassNames::default();
        Self {
            core_schema: names.schema,
            element_class: names.element,
            unique_aspect_class: names.unique_aspect,
            multi_aspect_class: names.multi_aspect,
            model_class: names.model,
            element_refers_to_elements_class: names.element_refers_to_elements,
            code_spec_class: names.code_spec,
            font_table: "dgn_Font".to_owned(),
            schema_table_prefix: "ec_".to_owned(),
            schema_changes: SchemaChangePolicy::Ignore,
        }
    }
}

impl ExtractConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|err| ChangeIdsError::invalid_config(format!("parse failed: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading extraction config");
        Self::from_toml_str(&raw).map_err(|err| match err {
            ChangeIdsError::InvalidConfig { detail } => {
                ChangeIdsError::invalid_config(format!("{}: {detail}", path.display()))
            }
            other => other,
        })
    }

    /// Reject empty names.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("core_schema", &self.core_schema),
            ("element_class", &self.element_class),
            ("unique_aspect_class", &self.unique_aspect_class),
            ("multi_aspect_class", &self.multi_aspect_class),
            ("model_class", &self.model_class),
            (
                "element_refers_to_elements_class",
                &self.element_refers_to_elements_class,
            ),
            ("code_spec_class", &self.code_spec_class),
            ("font_table", &self.font_table),
            ("schema_table_prefix", &self.schema_table_prefix),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ChangeIdsError::invalid_config(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn class_names(&self) -> CategoryClassNames {
        CategoryClassNames {
            schema: self.core_schema.clone(),
            element: self.element_class.clone(),
            unique_aspect: self.unique_aspect_class.clone(),
            multi_aspect: self.multi_aspect_class.clone(),
            model: self.model_class.clone(),
            element_refers_to_elements: self.element_refers_to_elements_class.clone(),
            code_spec: self.code_spec_class.clone(),
        }
    }

    /// Legacy-table rules in the order they are consulted.
    #[must_use]
    pub fn legacy_rules(&self) -> Vec<LegacyTableRule> {
        vec![LegacyTableRule::font(&self.font_table)]
    }

    /// Whether `table` belongs to the schema catalog.
    #[must_use]
    pub fn is_schema_table(&self, table: &str) -> bool {
        table
            .get(..self.schema_table_prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&self.schema_table_prefix))
    }
}
