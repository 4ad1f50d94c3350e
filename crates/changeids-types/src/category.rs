//! Logical entity categories a physical row can belong to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output bucket of the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Element,
    Aspect,
    Model,
    Relationship,
    CodeSpec,
    Font,
}

impl EntityCategory {
    pub const ALL: [Self; 6] = [
        Self::Element,
        Self::Aspect,
        Self::Model,
        Self::Relationship,
        Self::CodeSpec,
        Self::Font,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::Aspect => "aspect",
            Self::Model => "model",
            Self::Relationship => "relationship",
            Self::CodeSpec => "code_spec",
            Self::Font => "font",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive root classes the table-root lookup can resolve to.
///
/// Font rows never resolve through the catalog, so there is no font variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootClass {
    Element,
    UniqueAspect,
    MultiAspect,
    Model,
    ElementRefersToElements,
    CodeSpec,
}

impl RootClass {
    pub const ALL: [Self; 6] = [
        Self::Element,
        Self::UniqueAspect,
        Self::MultiAspect,
        Self::Model,
        Self::ElementRefersToElements,
        Self::CodeSpec,
    ];

    /// Output map a row with this root class is recorded in.
    #[must_use]
    pub const fn category(self) -> EntityCategory {
        match self {
            Self::Element => EntityCategory::Element,
            Self::UniqueAspect | Self::MultiAspect => EntityCategory::Aspect,
            Self::Model => EntityCategory::Model,
            Self::ElementRefersToElements => EntityCategory::Relationship,
            Self::CodeSpec => EntityCategory::CodeSpec,
        }
    }
}
