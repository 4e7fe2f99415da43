use crate::cell::Cell;
use std::fmt;

/// Reasons the agent refuses an observation.
///
/// A single false certainty can never be taken back, so any of these leaves
/// the knowledge base exactly as it was before the call. They travel inside
/// `anyhow::Error`; use `downcast_ref::<KnowledgeError>()` to inspect them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    OutOfBounds(Cell),
    CountOutOfRange {
        cell: Cell,
        count: usize,
        neighbors: usize,
    },
    RevealedKnownMine(Cell),
    ConflictingObservation {
        cell: Cell,
        previous: usize,
        count: usize,
    },
    Contradiction(String),
}

impl fmt::Display for KnowledgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeError::OutOfBounds(cell) => write!(f, "cell {cell} is outside the board"),
            KnowledgeError::CountOutOfRange {
                cell,
                count,
                neighbors,
            } => write!(
                f,
                "cell {cell} reports {count} mines but only has {neighbors} neighbors"
            ),
            KnowledgeError::RevealedKnownMine(cell) => {
                write!(f, "cell {cell} was revealed but is a known mine")
            }
            KnowledgeError::ConflictingObservation {
                cell,
                previous,
                count,
            } => write!(
                f,
                "cell {cell} was already observed with count {previous}, now {count}"
            ),
            KnowledgeError::Contradiction(reason) => write!(f, "contradiction: {reason}"),
        }
    }
}

impl std::error::Error for KnowledgeError {}
