//! Multi-file driver: classify every row change of every file, in order,
//! and fold the results into one [`ChangedInstanceIds`].

use std::path::Path;

use changeids_catalog::{CatalogSource, SchemaCatalog};
use changeids_error::Result;
use changeids_types::{ChangedInstanceIds, Cx, ExtractStats};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::classify::{Classification, Classifier};
use crate::config::ExtractConfig;
use crate::iter::ChangeSetFile;
use crate::legacy::LegacyTableRule;

/// Extraction engine bound to one resolved catalog.
///
/// The catalog is read once at construction; the store is not touched again.
#[derive(Debug)]
pub struct ChangedIdsExtractor {
    catalog: SchemaCatalog,
    config: ExtractConfig,
    rules: Vec<LegacyTableRule>,
    cx: Cx,
}

impl ChangedIdsExtractor {
    /// Validate `config` and resolve the catalog from `source`.
    pub fn new<S: CatalogSource + ?Sized>(source: &S, config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        let catalog = SchemaCatalog::load(source, &config.class_names())?;
        Self::with_catalog(catalog, config)
    }

    /// Use an already resolved catalog.
    pub fn with_catalog(catalog: SchemaCatalog, config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.legacy_rules();
        Ok(Self {
            catalog,
            config,
            rules,
            cx: Cx::new(),
        })
    }

    /// Attach a cancellation context, checked before each file.
    #[must_use]
    pub fn with_cx(mut self, cx: Cx) -> Self {
        self.cx = cx;
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Process `paths` in order, merging into `out`.
    ///
    /// The first fatal error stops the run and is returned with its file
    /// path and change index attached. `out` keeps whatever was merged
    /// before the failure.
    pub fn extract_into<P: AsRef<Path>>(
        &self,
        out: &mut ChangedInstanceIds,
        paths: &[P],
    ) -> Result<ExtractStats> {
        let mut total = ExtractStats::default();
        for path in paths {
            let path = path.as_ref();
            self.cx.checkpoint_with("before change-set file")?;
            let file = ChangeSetFile::open(path).map_err(|err| err.in_file(path, None))?;
            let stats = self.process_file(out, &file)?;
            total.absorb(&stats);
        }
        info!(
            files = total.files,
            changes = total.changes,
            recorded = total.recorded,
            ignored = total.ignored,
            unresolved = total.unresolved,
            indirect = total.indirect,
            "change-set extraction finished"
        );
        Ok(total)
    }

    /// Process `paths` into a fresh result.
    pub fn extract<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ChangedInstanceIds> {
        let mut out = ChangedInstanceIds::new();
        self.extract_into(&mut out, paths)?;
        Ok(out)
    }

    /// Classify and merge every change of one loaded file.
    pub fn process_file(
        &self,
        out: &mut ChangedInstanceIds,
        file: &ChangeSetFile,
    ) -> Result<ExtractStats> {
        let classifier = Classifier::new(&self.catalog, &self.rules, &self.config);
        let mut stats = ExtractStats::default();
        let mut changes = file.changes(&self.catalog);

        while let Some(entry) = changes.next() {
            let entry =
                entry.map_err(|err| err.in_file(file.path(), Some(changes.changes_read())))?;
            stats.changes += 1;
            if entry.is_indirect() {
                stats.indirect += 1;
            }
            let classification = classifier
                .classify(&entry)
                .map_err(|err| err.in_file(file.path(), Some(entry.index())))?;
            match classification {
                Classification::Record { category, id, op } => {
                    out.record(category, id, op);
                    stats.recorded += 1;
                }
                Classification::Ignored(_) => stats.ignored += 1,
                Classification::Unresolved(_) => stats.unresolved += 1,
            }
        }

        stats.files = 1;
        debug!(
            path = %file.path().display(),
            changes = stats.changes,
            recorded = stats.recorded,
            unresolved = stats.unresolved,
            "change-set file processed"
        );
        Ok(stats)
    }
}

/// Net changed instance ids of `paths`, applied in order, using the catalog
/// of `conn` and default settings.
pub fn extract_changed_instance_ids<P: AsRef<Path>>(
    conn: &Connection,
    paths: &[P],
) -> Result<ChangedInstanceIds> {
    ChangedIdsExtractor::new(conn, ExtractConfig::default())?.extract(paths)
}
