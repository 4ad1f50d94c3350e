//! Result of an extraction run: one net op-map per category.

use serde::{Deserialize, Serialize};

use crate::category::EntityCategory;
use crate::id::{AspectId, CodeSpecId, ElementId, FontId, ModelId, RelationshipId};
use crate::opcode::{DbOpcode, OpMap, record_op};

/// Net opcode per changed instance, split by category.
///
/// The struct is created empty by the caller (or the driver) and filled in
/// change-set order. If a run fails midway the maps hold whatever was merged
/// before the failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedInstanceIds {
    pub elements: OpMap<ElementId>,
    pub aspects: OpMap<AspectId>,
    pub models: OpMap<ModelId>,
    pub relationships: OpMap<RelationshipId>,
    pub code_specs: OpMap<CodeSpecId>,
    pub fonts: OpMap<FontId>,
}

impl ChangedInstanceIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one observed operation on `raw_id` into the category's map.
    pub fn record(&mut self, category: EntityCategory, raw_id: u64, op: DbOpcode) {
        match category {
            EntityCategory::Element => record_op(&mut self.elements, ElementId::new(raw_id), op),
            EntityCategory::Aspect => record_op(&mut self.aspects, AspectId::new(raw_id), op),
            EntityCategory::Model => record_op(&mut self.models, ModelId::new(raw_id), op),
            EntityCategory::Relationship => {
                record_op(&mut self.relationships, RelationshipId::new(raw_id), op);
            }
            EntityCategory::CodeSpec => {
                record_op(&mut self.code_specs, CodeSpecId::new(raw_id), op);
            }
            EntityCategory::Font => record_op(&mut self.fonts, FontId::new(raw_id), op),
        }
    }

    /// Net opcode currently recorded for `raw_id` in `category`.
    #[must_use]
    pub fn get(&self, category: EntityCategory, raw_id: u64) -> Option<DbOpcode> {
        match category {
            EntityCategory::Element => self.elements.get(&ElementId::new(raw_id)),
            EntityCategory::Aspect => self.aspects.get(&AspectId::new(raw_id)),
            EntityCategory::Model => self.models.get(&ModelId::new(raw_id)),
            EntityCategory::Relationship => self.relationships.get(&RelationshipId::new(raw_id)),
            EntityCategory::CodeSpec => self.code_specs.get(&CodeSpecId::new(raw_id)),
            EntityCategory::Font => self.fonts.get(&FontId::new(raw_id)),
        }
        .copied()
    }

    #[must_use]
    pub fn len_of(&self, category: EntityCategory) -> usize {
        match category {
            EntityCategory::Element => self.elements.len(),
            EntityCategory::Aspect => self.aspects.len(),
            EntityCategory::Model => self.models.len(),
            EntityCategory::Relationship => self.relationships.len(),
            EntityCategory::CodeSpec => self.code_specs.len(),
            EntityCategory::Font => self.fonts.len(),
        }
    }

    /// Total number of entries across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        EntityCategory::ALL.iter().map(|c| self.len_of(*c)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Counters collected while processing change-sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Change-set files fully processed.
    pub files: u64,
    /// Row changes decoded.
    pub changes: u64,
    /// Row changes merged into an output map.
    pub recorded: u64,
    /// Row changes on tables outside the change-notification contract.
    pub ignored: u64,
    /// Row changes dropped because their table or key could not be resolved.
    pub unresolved: u64,
    /// Row changes flagged indirect.
    pub indirect: u64,
}

impl ExtractStats {
    pub fn absorb(&mut self, other: &Self) {
        self.files += other.files;
        self.changes += other.changes;
        self.recorded += other.recorded;
        self.ignored += other.ignored;
        self.unresolved += other.unresolved;
        self.indirect += other.indirect;
    }
}
