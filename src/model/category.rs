//! Hazard classification category tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three fixed hazard-classification categories.
///
/// The lifecycle core only uses these as map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryTag {
    /// TBC category
    Tbc,
    /// GR category
    Gr,
    /// PSPP category
    Pspp,
}

impl CategoryTag {
    /// Get the display name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            CategoryTag::Tbc => "TBC",
            CategoryTag::Gr => "GR",
            CategoryTag::Pspp => "PSPP",
        }
    }

    /// Get all category tags in display order.
    pub fn all() -> &'static [CategoryTag] {
        &[CategoryTag::Tbc, CategoryTag::Gr, CategoryTag::Pspp]
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
