use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the semantic type of a vote cast on an entity.
///
/// The set is closed: every label stored in the vote record table or exposed as
/// a counter column maps to exactly one variant. Deprecated variants stay in the
/// enum so historical records can still be read and migrated.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VoteCategory {
    /// The voter supports the protest or boycott.
    Support,
    /// Legacy label for opposition votes. Replaced by `Opposition`.
    Oppose,
    /// The voter opposes the protest or boycott.
    Opposition,
}

impl VoteCategory {
    /// Every known category, current and deprecated.
    pub const ALL: [VoteCategory; 3] = [
        VoteCategory::Support,
        VoteCategory::Oppose,
        VoteCategory::Opposition,
    ];

    /// The storage label of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteCategory::Support => "support",
            VoteCategory::Oppose => "oppose",
            VoteCategory::Opposition => "opposition",
        }
    }

    /// Whether new votes may be cast with this category.
    pub fn is_current(&self) -> bool {
        !matches!(self, VoteCategory::Oppose)
    }

    /// Every category new votes may be cast with.
    pub fn current() -> impl Iterator<Item = VoteCategory> {
        Self::ALL.into_iter().filter(VoteCategory::is_current)
    }
}

impl fmt::Display for VoteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a label does not name any known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown vote category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for VoteCategory {
    type Err = UnknownCategory;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label {
            "support" => Ok(VoteCategory::Support),
            "oppose" => Ok(VoteCategory::Oppose),
            "opposition" => Ok(VoteCategory::Opposition),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A rename of one category to another across every record and counter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryMigration {
    pub from: VoteCategory,
    pub to: VoteCategory,
}

impl CategoryMigration {
    /// Retires the legacy `oppose` label in favour of `opposition`.
    pub const OPPOSE_TO_OPPOSITION: CategoryMigration = CategoryMigration {
        from: VoteCategory::Oppose,
        to: VoteCategory::Opposition,
    };

    pub fn new(from: VoteCategory, to: VoteCategory) -> Self {
        Self { from, to }
    }

    /// A migration onto the same category would relabel nothing.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for CategoryMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
