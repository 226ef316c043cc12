//! Board input dispatch.
//!
//! [`BoardInteraction`] owns all transient interaction state of one board:
//! the drag session, the connection draft, and the selection. Input arrives
//! as [`BoardEvent`]s already converted to canvas coordinates; each event
//! yields at most one [`Command`] for the caller to persist.

use crate::draft::{ConnectionDraft, ConnectionRequest, DraftState};
use crate::drag::{DragController, DragOutcome, MouseButton, PointerTarget};
use crate::geometry::PositionOverride;
use crate::model::{ConnectionId, ItemId};
use kurbo::Point;

/// Input to the board, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoardEvent {
    /// Pointer pressed on a node.
    PointerDown {
        item: ItemId,
        pointer: Point,
        /// Committed position of the node.
        origin: Point,
        button: MouseButton,
        target: PointerTarget,
    },
    PointerMove { pointer: Point },
    PointerUp { pointer: Point },
    /// The node's "connect" control was used.
    StartDraft(ItemId),
    CompleteDraft(ItemId),
    /// Escape, or a click on empty canvas.
    Cancel,
    /// Click on a connection's hit line.
    ClickConnection(ConnectionId),
}

/// Durable change requested by an interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    CommitPosition { item: ItemId, position: Point },
    CreateConnection(ConnectionRequest),
    DeleteConnection(ConnectionId),
}

/// How a node should present itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Selected,
    Dragging,
    /// Source of the active connection draft.
    DraftSource,
    /// Valid completion target of the active draft.
    DraftTarget,
}

/// Transient interaction state of one board.
#[derive(Debug, Clone, Default)]
pub struct BoardInteraction {
    drag: DragController,
    draft: ConnectionDraft,
    selected: Option<ItemId>,
}

impl BoardInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one input event.
    pub fn dispatch(&mut self, event: BoardEvent) -> Option<Command> {
        match event {
            BoardEvent::PointerDown {
                item,
                pointer,
                origin,
                button,
                target,
            } => {
                if self.draft.is_drafting() {
                    // Any node click finishes the draft; selection and
                    // dragging are suspended meanwhile.
                    if button == MouseButton::Left {
                        return self.complete_draft(item);
                    }
                    return None;
                }
                self.drag.begin(item, pointer, origin, button, target);
                None
            }
            BoardEvent::PointerMove { pointer } => {
                self.drag.pointer_move(pointer);
                None
            }
            BoardEvent::PointerUp { pointer } => match self.drag.end(pointer)? {
                DragOutcome::Click(item) => {
                    self.selected = Some(item);
                    None
                }
                DragOutcome::Moved { item, position } => {
                    Some(Command::CommitPosition { item, position })
                }
            },
            BoardEvent::StartDraft(item) => {
                if self.drag.is_active() {
                    return None;
                }
                self.draft.start(item);
                self.selected = None;
                None
            }
            BoardEvent::CompleteDraft(item) => self.complete_draft(item),
            BoardEvent::Cancel => {
                if self.drag.cancel().is_none() && !self.draft.cancel() {
                    self.selected = None;
                }
                None
            }
            BoardEvent::ClickConnection(id) => {
                if self.draft.is_drafting() || self.drag.is_active() {
                    return None;
                }
                Some(Command::DeleteConnection(id))
            }
        }
    }

    fn complete_draft(&mut self, item: ItemId) -> Option<Command> {
        self.draft.complete(item).map(Command::CreateConnection)
    }

    pub fn draft_state(&self) -> DraftState {
        self.draft.state()
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    /// Forget the selection, e.g. after the item was unpinned.
    pub fn deselect(&mut self, item: ItemId) {
        if self.selected == Some(item) {
            self.selected = None;
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    /// Display override for the node being dragged.
    pub fn overlay(&self) -> Option<PositionOverride> {
        self.drag.overlay()
    }

    /// Presentation state of a node.
    pub fn node_state(&self, item: ItemId) -> NodeState {
        if self.drag.session().is_some_and(|s| s.item == item) {
            return NodeState::Dragging;
        }
        match self.draft.state() {
            DraftState::Drafting { from } if from == item => NodeState::DraftSource,
            DraftState::Drafting { .. } => NodeState::DraftTarget,
            DraftState::Idle if self.selected == Some(item) => NodeState::Selected,
            DraftState::Idle => NodeState::Idle,
        }
    }
}
