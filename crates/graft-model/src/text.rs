use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::decl::UnitId;

/// A half-open text range `[start, end)` in UTF-8 byte offsets.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "invalid range: {start}..{end}");
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains_range(self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(self, other: TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shift the range left so it is relative to `base`.
    pub fn relative_to(self, base: usize) -> TextRange {
        TextRange::new(self.start - base, self.end - base)
    }
}

/// A range within a specific compilation unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub unit: UnitId,
    pub range: TextRange,
}

impl Span {
    pub fn new(unit: UnitId, range: TextRange) -> Self {
        Self { unit, range }
    }
}
