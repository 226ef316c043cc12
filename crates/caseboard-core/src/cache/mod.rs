//! Local read cache and the optimistic mutation protocol.

mod mutation;
mod query;

pub use mutation::{CacheSnapshot, MutationError, MutationResult, OptimisticMutation};
pub use query::{FetchStatus, QueryCache};

use crate::model::BoardId;

/// Structural key of a cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    BoardItems(BoardId),
    BoardConnections(BoardId),
    BoardNotes(BoardId),
}
