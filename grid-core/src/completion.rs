use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{GridCell, GridDims};

/// Which cells the artist has finished, keyed by `"row-col"`.
/// An absent key means not completed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionMap(BTreeMap<String, bool>);

impl CompletionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the flag for `key` and returns the new value.
    pub fn toggle(&mut self, key: &str) -> bool {
        let next = !self.is_complete(key);
        self.set(key, next);
        next
    }

    pub fn set(&mut self, key: &str, completed: bool) {
        self.0.insert(key.to_string(), completed);
    }

    pub fn is_complete(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn is_cell_complete(&self, cell: GridCell) -> bool {
        self.is_complete(&cell.key())
    }

    /// Number of keys currently marked complete.
    pub fn count(&self) -> usize {
        self.0.values().filter(|v| **v).count()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Completed cells that parse and fall inside `dims`; anything else is skipped.
    pub fn completed_cells(&self, dims: GridDims) -> Vec<GridCell> {
        self.0
            .iter()
            .filter(|(_, done)| **done)
            .filter_map(|(k, _)| k.parse::<GridCell>().ok())
            .filter(|c| dims.contains(*c))
            .collect()
    }

}

impl FromIterator<(String, bool)> for CompletionMap {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        CompletionMap(iter.into_iter().collect())
    }
}
