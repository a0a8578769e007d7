//! Shared value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two independent validation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Lint,
    Test,
}

impl ValidationKind {
    pub const ALL: [ValidationKind; 2] = [ValidationKind::Lint, ValidationKind::Test];

    /// Target/task/recipe/script name probed for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKind::Lint => "lint",
            ValidationKind::Test => "test",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kinds the skip registry turned off for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipConfiguration {
    pub skip_lint: bool,
    pub skip_test: bool,
}

impl SkipConfiguration {
    pub fn skips(self, kind: ValidationKind) -> bool {
        match kind {
            ValidationKind::Lint => self.skip_lint,
            ValidationKind::Test => self.skip_test,
        }
    }

    pub fn skips_everything(self) -> bool {
        self.skip_lint && self.skip_test
    }
}
