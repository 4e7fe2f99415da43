use crate::cell::{Cell, Grid};
use crate::error::KnowledgeError;
use crate::sentence::Sentence;
use rand::Rng;
use rand::prelude::IndexedRandom;
use std::collections::{BTreeMap, BTreeSet};

/// Minesweeper player that reasons over a knowledge base of sentences.
///
/// The agent only ever learns through [`Agent::add_knowledge`]. Every call
/// runs deduction to a fixpoint before returning, so `mines`, `safes` and
/// `knowledge` are always fully propagated when the caller looks at them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Agent {
    grid: Grid,
    /// Cells already played, with the neighbor count they reported.
    moves_made: BTreeMap<Cell, usize>,
    mines: BTreeSet<Cell>,
    safes: BTreeSet<Cell>,
    /// Live sentences, none of them resolved and none mentioning a known cell.
    knowledge: BTreeSet<Sentence>,
}

impl Agent {
    pub fn new(height: usize, width: usize) -> Self {
        Agent {
            grid: Grid::new(height, width),
            moves_made: BTreeMap::new(),
            mines: BTreeSet::new(),
            safes: BTreeSet::new(),
            knowledge: BTreeSet::new(),
        }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn safes(&self) -> &BTreeSet<Cell> {
        &self.safes
    }

    pub fn moves_made(&self) -> impl Iterator<Item = Cell> + '_ {
        self.moves_made.keys().copied()
    }

    pub fn has_played(&self, cell: Cell) -> bool {
        self.moves_made.contains_key(&cell)
    }

    pub fn knowledge(&self) -> impl Iterator<Item = &Sentence> {
        self.knowledge.iter()
    }

    /// Records that `cell` was revealed safe with `count` mines around it,
    /// then deduces everything that follows.
    ///
    /// The update is all or nothing: when the observation is invalid or
    /// contradicts what is already known, an error is returned and the agent
    /// is left untouched. Repeating an observation verbatim is a no-op.
    pub fn add_knowledge(&mut self, cell: Cell, count: usize) -> anyhow::Result<()> {
        if !self.grid.contains(cell) {
            anyhow::bail!(KnowledgeError::OutOfBounds(cell));
        }
        if let Some(&previous) = self.moves_made.get(&cell) {
            if previous != count {
                anyhow::bail!(KnowledgeError::ConflictingObservation {
                    cell,
                    previous,
                    count,
                });
            }
            return Ok(());
        }
        if self.mines.contains(&cell) {
            anyhow::bail!(KnowledgeError::RevealedKnownMine(cell));
        }
        let neighbors = self.grid.neighbors(cell).count();
        if count > neighbors {
            anyhow::bail!(KnowledgeError::CountOutOfRange {
                cell,
                count,
                neighbors,
            });
        }

        let _span = tracing::debug_span!("add_knowledge", %cell, count).entered();

        // Work on a scratch copy so a contradiction found halfway through
        // never leaks into the real knowledge base.
        let mut next = self.clone();
        next.observe(cell, count)?;
        next.deduce()?;
        *self = next;

        tracing::debug!(
            mines = self.mines.len(),
            safes = self.safes.len(),
            sentences = self.knowledge.len(),
            "knowledge updated"
        );
        Ok(())
    }

    /// A cell known to be safe that hasn't been played yet, lowest
    /// coordinate first.
    pub fn safe_move(&self) -> Option<Cell> {
        self.safes
            .iter()
            .copied()
            .find(|cell| !self.moves_made.contains_key(cell))
    }

    /// Cells that are neither played nor known mines, in row-major order.
    pub fn fallback_candidates(&self) -> impl Iterator<Item = Cell> + '_ {
        self.grid
            .cells()
            .filter(|cell| !self.moves_made.contains_key(cell) && !self.mines.contains(cell))
    }

    /// Uniformly random pick among the fallback candidates.
    pub fn random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Cell> {
        let candidates: Vec<Cell> = self.fallback_candidates().collect();
        candidates.choose(rng).copied()
    }

    /// Steps 1-3 of an update: play the cell, mark it safe, and store what
    /// its count says about the still unknown neighbors.
    fn observe(&mut self, cell: Cell, count: usize) -> anyhow::Result<()> {
        self.moves_made.insert(cell, count);
        self.mark_safe(cell)?;

        let mut unknown = Vec::new();
        let mut remaining = count;
        for neighbor in self.grid.neighbors(cell) {
            if self.safes.contains(&neighbor) {
                continue;
            }
            if self.mines.contains(&neighbor) {
                remaining = remaining.checked_sub(1).ok_or_else(|| {
                    KnowledgeError::Contradiction(format!(
                        "{cell} reports {count} mines but more neighbors are known mines"
                    ))
                })?;
                continue;
            }
            unknown.push(neighbor);
        }

        let sentence = Sentence::new(unknown, remaining);
        if !sentence.is_consistent() {
            anyhow::bail!(KnowledgeError::Contradiction(format!(
                "{cell} reports {count} mines but too few neighbors are left unknown"
            )));
        }
        if !sentence.is_empty() {
            tracing::trace!(%sentence, "new sentence");
            self.knowledge.insert(sentence);
        }
        Ok(())
    }

    /// Repeats full passes over the knowledge base until one changes nothing.
    ///
    /// A pass classifies cells from resolved sentences until none are left
    /// to classify, drops those sentences, then applies the subset rule to
    /// every ordered pair. Classifications and distinct sentences are both
    /// bounded by the board size, so the loop ends.
    fn deduce(&mut self) -> anyhow::Result<()> {
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut progress = false;

            // Marking can resolve further sentences, which must be read
            // before they are dropped below.
            while self.classify_resolved()? {
                progress = true;
            }

            let before = self.knowledge.len();
            self.knowledge.retain(|sentence| !sentence.is_resolved());
            progress |= self.knowledge.len() != before;

            for derived in self.subset_inferences()? {
                if self.knowledge.insert(derived.clone()) {
                    tracing::trace!(sentence = %derived, "inferred sentence");
                    progress = true;
                }
            }

            if !progress {
                break;
            }
        }

        tracing::trace!(passes, "fixpoint reached");
        Ok(())
    }

    /// Marks every cell some sentence proves to be a mine or safe. Returns
    /// whether anything new was classified.
    fn classify_resolved(&mut self) -> anyhow::Result<bool> {
        // Collected before any marking so that a cell claimed both ways is
        // caught rather than silently reconciled.
        let mut new_mines = BTreeSet::new();
        let mut new_safes = BTreeSet::new();
        for sentence in &self.knowledge {
            new_mines.extend(sentence.known_mines());
            new_safes.extend(sentence.known_safes());
        }
        if let Some(cell) = new_mines.intersection(&new_safes).next() {
            anyhow::bail!(KnowledgeError::Contradiction(format!(
                "{cell} is both a mine and safe"
            )));
        }

        let mut classified = false;
        for cell in new_mines {
            if !self.mines.contains(&cell) {
                tracing::debug!(%cell, "deduced mine");
                self.mark_mine(cell)?;
                classified = true;
            }
        }
        for cell in new_safes {
            if !self.safes.contains(&cell) {
                tracing::debug!(%cell, "deduced safe");
                self.mark_safe(cell)?;
                classified = true;
            }
        }
        Ok(classified)
    }

    /// New sentences obtained by subtracting each sentence from its strict
    /// supersets.
    fn subset_inferences(&self) -> anyhow::Result<Vec<Sentence>> {
        let mut derived = Vec::new();
        for small in &self.knowledge {
            for big in &self.knowledge {
                if small.cells() == big.cells() && small.count() != big.count() {
                    anyhow::bail!(KnowledgeError::Contradiction(format!(
                        "{small} and {big} cover the same cells"
                    )));
                }
                if let Some(sentence) = small.subtract_from(big)? {
                    if !sentence.is_empty() && !self.knowledge.contains(&sentence) {
                        derived.push(sentence);
                    }
                }
            }
        }
        Ok(derived)
    }

    fn mark_mine(&mut self, cell: Cell) -> anyhow::Result<()> {
        if self.safes.contains(&cell) {
            anyhow::bail!(KnowledgeError::Contradiction(format!(
                "{cell} is known safe, cannot be a mine"
            )));
        }
        if let Some(sentence) = self
            .knowledge
            .iter()
            .find(|sentence| sentence.count() == 0 && sentence.cells().contains(&cell))
        {
            anyhow::bail!(KnowledgeError::Contradiction(format!(
                "{sentence} rules out a mine at {cell}"
            )));
        }

        self.mines.insert(cell);
        self.update_sentences(|sentence| sentence.mark_mine(cell));
        Ok(())
    }

    fn mark_safe(&mut self, cell: Cell) -> anyhow::Result<()> {
        if self.mines.contains(&cell) {
            anyhow::bail!(KnowledgeError::Contradiction(format!(
                "{cell} is a known mine, cannot be safe"
            )));
        }

        self.safes.insert(cell);
        self.update_sentences(|sentence| sentence.mark_safe(cell));
        self.check_sentences()
    }

    /// Applies `update` to every sentence. Sentences that end up equal
    /// collapse into one since they are re-keyed by their new contents.
    fn update_sentences(&mut self, update: impl Fn(&mut Sentence)) {
        self.knowledge = std::mem::take(&mut self.knowledge)
            .into_iter()
            .map(|mut sentence| {
                update(&mut sentence);
                sentence
            })
            .collect();
    }

    fn check_sentences(&self) -> anyhow::Result<()> {
        match self.knowledge.iter().find(|s| !s.is_consistent()) {
            Some(sentence) => anyhow::bail!(KnowledgeError::Contradiction(format!(
                "{sentence} needs more mines than it has cells"
            ))),
            None => Ok(()),
        }
    }
}
