//! Read-only snapshot of a board for rendering.

use crate::geometry::{self, EdgeGeometry, PositionOverride};
use crate::interaction::{BoardInteraction, NodeState};
use crate::model::{BoardConnection, BoardDocument, BoardItem, ItemId};
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Committed items and connections plus the presentation state of the
/// current interaction.
#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub items: Vec<BoardItem>,
    pub connections: Vec<BoardConnection>,
    /// Display position of the node being dragged.
    pub overlay: Option<PositionOverride>,
    node_states: HashMap<ItemId, NodeState>,
}

impl BoardView {
    pub fn new(items: Vec<BoardItem>, connections: Vec<BoardConnection>) -> Self {
        Self {
            items,
            connections,
            overlay: None,
            node_states: HashMap::new(),
        }
    }

    /// View of a stored document with no interaction in progress.
    pub fn from_document(document: &BoardDocument) -> Self {
        Self::new(document.items.clone(), document.connections.clone())
    }

    /// Take over the drag override and node states of `interaction`.
    pub fn with_interaction(mut self, interaction: &BoardInteraction) -> Self {
        self.overlay = interaction.overlay();
        self.node_states = self
            .items
            .iter()
            .map(|item| (item.id, interaction.node_state(item.id)))
            .filter(|(_, state)| *state != NodeState::Idle)
            .collect();
        self
    }

    pub fn node_state(&self, item: ItemId) -> NodeState {
        self.node_states
            .get(&item)
            .copied()
            .unwrap_or(NodeState::Idle)
    }

    /// Where `item` is drawn.
    pub fn display_position(&self, item: &BoardItem) -> Point {
        geometry::display_position(item, self.overlay)
    }

    /// Drawable connections.
    pub fn edges(&self) -> Vec<EdgeGeometry> {
        geometry::edges(&self.connections, &self.items, self.overlay)
    }

    /// Bounding box of all nodes as drawn.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.items
            .iter()
            .map(|item| geometry::node_rect(self.display_position(item)))
            .reduce(|acc, r| acc.union(r))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
