use serde::{Deserialize, Serialize};
use std::fmt;

/// Request-wide annotation index. Identifies one placeholder pair or one self-closing
/// annotation and is never reused within a request, across kinds included.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AnnotationIndex(pub u64);

impl fmt::Display for AnnotationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for AnnotationIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Source of annotation indices. Every call returns a value strictly greater than the last.
pub trait IdAllocator {
    fn next_index(&mut self) -> AnnotationIndex;
}

/// Counter-backed allocator, the default for a request context.
#[derive(Clone, Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first allocated index will be `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl IdAllocator for SequentialIds {
    fn next_index(&mut self) -> AnnotationIndex {
        let index = AnnotationIndex(self.next);
        self.next = self
            .next
            .checked_add(1)
            .expect("annotation index space exhausted");
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_strictly_increase() {
        let mut ids = SequentialIds::starting_at(5);
        let issued: Vec<_> = (0..4).map(|_| ids.next_index().0).collect();
        assert_eq!(issued, [5, 6, 7, 8]);
    }

    #[test]
    fn index_serializes_as_bare_integer() {
        let json = serde_json::to_string(&AnnotationIndex(42)).expect("serialize");
        assert_eq!(json, "42");
    }
}
