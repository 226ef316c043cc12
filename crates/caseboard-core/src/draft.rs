//! Connection drafting: pick a source node, then a target node.

use crate::model::ItemId;
use serde::{Deserialize, Serialize};

/// Draft state of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DraftState {
    #[default]
    Idle,
    Drafting { from: ItemId },
}

/// Request to create a connection, produced by a completed draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub from: ItemId,
    pub to: ItemId,
}

/// Owns the (at most one) connection draft of a board.
#[derive(Debug, Clone, Default)]
pub struct ConnectionDraft {
    state: DraftState,
}

impl ConnectionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    /// Begin drafting from `item`, replacing any previous draft.
    pub fn start(&mut self, item: ItemId) {
        if let DraftState::Drafting { from } = self.state {
            if from != item {
                log::debug!("draft source moved from item {from} to item {item}");
            }
        }
        self.state = DraftState::Drafting { from: item };
    }

    /// Finish the draft on `item`.
    ///
    /// Completing on the source node keeps the draft open and yields nothing.
    /// Completing while idle yields nothing.
    pub fn complete(&mut self, item: ItemId) -> Option<ConnectionRequest> {
        match self.state {
            DraftState::Drafting { from } if from != item => {
                self.state = DraftState::Idle;
                log::debug!("draft completed: {from} -> {item}");
                Some(ConnectionRequest { from, to: item })
            }
            _ => None,
        }
    }

    /// Drop the draft. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_drafting = self.is_drafting();
        self.state = DraftState::Idle;
        was_drafting
    }

    pub fn is_drafting(&self) -> bool {
        matches!(self.state, DraftState::Drafting { .. })
    }

    /// Source node of the active draft.
    pub fn source(&self) -> Option<ItemId> {
        match self.state {
            DraftState::Drafting { from } => Some(from),
            DraftState::Idle => None,
        }
    }

    /// Whether `item` can currently finish the draft.
    pub fn is_target(&self, item: ItemId) -> bool {
        matches!(self.state, DraftState::Drafting { from } if from != item)
    }
}
