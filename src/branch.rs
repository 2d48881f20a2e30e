use crate::Frontier;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A materialized snapshot of the list at some version.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Branch<T> {
    pub snapshot: Vec<T>,
    pub version: Frontier,
}

impl<T> Branch<T> {
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}
