//! Caseboard Core Library
//!
//! Platform-agnostic data model, geometry, interaction state and
//! synchronization logic for the Caseboard diagram editor.

pub mod board;
pub mod cache;
pub mod camera;
pub mod client;
pub mod draft;
pub mod drag;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod view;

pub use board::{BoardError, BoardResult, BoardSession, Notice};
pub use cache::{MutationError, OptimisticMutation, QueryCache, QueryKey};
pub use camera::Camera;
pub use client::{BoardClient, ClientError, ClientResult, FileClient, MemoryClient};
pub use draft::{ConnectionDraft, ConnectionRequest, DraftState};
pub use drag::{
    DRAG_THRESHOLD, DragController, DragOutcome, DragSession, MouseButton, PointerTarget,
};
pub use geometry::{EdgeGeometry, NODE_SIZE, PositionOverride};
pub use interaction::{BoardEvent, BoardInteraction, Command, NodeState};
pub use model::{
    BoardConnection, BoardDocument, BoardId, BoardItem, ConnectionId, ItemId, ItemModel, Note,
    NoteDraft, NoteId, RecordRef, SerializableColor,
};
pub use view::BoardView;
