use crate::cell::Cell;
use crate::error::KnowledgeError;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// Cells are kept sorted so that two sentences over the same cells compare
/// equal no matter how they were derived. Ordering follows `(cells, count)`,
/// which lets the knowledge base hold sentences in a `BTreeSet` and drop
/// duplicates for free.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Sentence {
    cells: BTreeSet<Cell>,
    count: usize,
}

impl Sentence {
    pub fn new(cells: impl IntoIterator<Item = Cell>, count: usize) -> Self {
        Sentence {
            cells: cells.into_iter().collect(),
            count,
        }
    }

    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every cell is a mine when the count covers the whole set.
    pub fn known_mines(&self) -> BTreeSet<Cell> {
        if self.count == self.cells.len() {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Every cell is safe when the count is zero.
    pub fn known_safes(&self) -> BTreeSet<Cell> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Removes a proven mine, keeping the statement true for the rest.
    pub fn mark_mine(&mut self, cell: Cell) {
        if self.cells.remove(&cell) {
            self.count = self.count.saturating_sub(1);
        }
    }

    pub fn mark_safe(&mut self, cell: Cell) {
        self.cells.remove(&cell);
    }

    /// Nothing left to learn: all mines or all safes (an empty sentence is both).
    pub fn is_resolved(&self) -> bool {
        self.count == 0 || self.count == self.cells.len()
    }

    /// A sentence claiming more mines than it has cells cannot be true.
    pub fn is_consistent(&self) -> bool {
        self.count <= self.cells.len()
    }

    /// Subset rule. If `self` is a non-empty strict subset of `other`, the
    /// cells `other` has in addition hold exactly the difference in counts.
    ///
    /// Fails when that difference would be negative: the two sentences cannot
    /// both hold.
    pub fn subtract_from(&self, other: &Sentence) -> Result<Option<Sentence>, KnowledgeError> {
        if self.cells.is_empty()
            || self.cells.len() >= other.cells.len()
            || !self.cells.is_subset(&other.cells)
        {
            return Ok(None);
        }

        let count = other.count.checked_sub(self.count).ok_or_else(|| {
            KnowledgeError::Contradiction(format!("{self} is contained in {other}"))
        })?;

        Ok(Some(Sentence {
            cells: other.cells.difference(&self.cells).copied().collect(),
            count,
        }))
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} = {}", self.cells.iter().join(", "), self.count)
    }
}
