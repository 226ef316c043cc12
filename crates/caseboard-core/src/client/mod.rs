//! Persistence client abstraction.
//!
//! The board never talks to a server directly; it goes through a
//! [`BoardClient`]. Implementations can be an HTTP API, the in-memory
//! [`MemoryClient`] used in tests, or the JSON [`FileClient`].

mod file;
mod memory;

pub use file::FileClient;
pub use memory::{ClientOp, MemoryClient};

use crate::model::{
    BoardConnection, BoardDocument, BoardId, BoardItem, ConnectionId, ItemId, ItemModel, Note,
    NoteDraft, NoteId, RecordRef,
};
use kurbo::Point;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected by server: {0}")]
    Rejected(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Client error: {0}")]
    Other(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Remote store for board items, connections and notes.
pub trait BoardClient: Send + Sync {
    fn list_items(&self, board: BoardId) -> BoxFuture<'_, ClientResult<Vec<BoardItem>>>;

    fn list_connections(
        &self,
        board: BoardId,
    ) -> BoxFuture<'_, ClientResult<Vec<BoardConnection>>>;

    /// Move an item; returns the stored item.
    fn update_item_position(
        &self,
        board: BoardId,
        item: ItemId,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<BoardItem>>;

    /// Pin a record onto the board.
    fn pin_record(
        &self,
        board: BoardId,
        record: RecordRef,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<BoardItem>>;

    /// Remove a pin and its connections.
    fn unpin_item(&self, board: BoardId, item: ItemId) -> BoxFuture<'_, ClientResult<()>>;

    fn create_connection(
        &self,
        board: BoardId,
        from: ItemId,
        to: ItemId,
        label: Option<String>,
    ) -> BoxFuture<'_, ClientResult<BoardConnection>>;

    fn delete_connection(
        &self,
        board: BoardId,
        connection: ConnectionId,
    ) -> BoxFuture<'_, ClientResult<()>>;

    /// Notes of the board's case.
    fn list_notes(&self, board: BoardId) -> BoxFuture<'_, ClientResult<Vec<Note>>>;

    /// Create a note and pin it at `position`.
    fn create_note(
        &self,
        board: BoardId,
        draft: NoteDraft,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<(Note, BoardItem)>>;

    fn update_note(
        &self,
        board: BoardId,
        note: NoteId,
        draft: NoteDraft,
    ) -> BoxFuture<'_, ClientResult<Note>>;

    /// Delete a note together with its pin.
    fn delete_note(&self, board: BoardId, note: NoteId) -> BoxFuture<'_, ClientResult<()>>;
}

// Server-side semantics shared by the bundled clients.

pub(crate) fn apply_move(
    doc: &mut BoardDocument,
    item: ItemId,
    position: Point,
) -> ClientResult<BoardItem> {
    let stored = doc
        .item_mut(item)
        .ok_or_else(|| ClientError::NotFound(format!("item {item}")))?;
    stored.set_position(position);
    Ok(stored.clone())
}

pub(crate) fn apply_unpin(doc: &mut BoardDocument, item: ItemId) -> ClientResult<()> {
    doc.remove_item(item)
        .map(|_| ())
        .ok_or_else(|| ClientError::NotFound(format!("item {item}")))
}

pub(crate) fn apply_connect(
    doc: &mut BoardDocument,
    from: ItemId,
    to: ItemId,
    label: Option<String>,
) -> ClientResult<BoardConnection> {
    for end in [from, to] {
        if doc.item(end).is_none() {
            return Err(ClientError::Rejected(format!("item {end} is not on board {}", doc.id)));
        }
    }
    Ok(doc.add_connection(from, to, label))
}

pub(crate) fn apply_disconnect(
    doc: &mut BoardDocument,
    connection: ConnectionId,
) -> ClientResult<()> {
    doc.remove_connection(connection)
        .map(|_| ())
        .ok_or_else(|| ClientError::NotFound(format!("connection {connection}")))
}

pub(crate) fn apply_create_note(
    doc: &mut BoardDocument,
    draft: NoteDraft,
    position: Point,
) -> ClientResult<(Note, BoardItem)> {
    let note = doc.add_note(draft);
    let pin = doc.add_item(
        position,
        RecordRef::new(note.id, ItemModel::Note, note.title.clone()),
    );
    Ok((note, pin))
}

pub(crate) fn apply_update_note(
    doc: &mut BoardDocument,
    note: NoteId,
    draft: NoteDraft,
) -> ClientResult<Note> {
    let stored = doc
        .notes
        .iter_mut()
        .find(|n| n.id == note)
        .ok_or_else(|| ClientError::NotFound(format!("note {note}")))?;
    stored.title = draft.title;
    stored.content = draft.content;
    let updated = stored.clone();
    for pin in doc
        .items
        .iter_mut()
        .filter(|i| i.model == ItemModel::Note && i.object_id == note)
    {
        pin.display_name = updated.title.clone();
    }
    Ok(updated)
}

pub(crate) fn apply_delete_note(doc: &mut BoardDocument, note: NoteId) -> ClientResult<()> {
    let index = doc
        .notes
        .iter()
        .position(|n| n.id == note)
        .ok_or_else(|| ClientError::NotFound(format!("note {note}")))?;
    doc.notes.remove(index);
    let pins: Vec<ItemId> = doc
        .items
        .iter()
        .filter(|i| i.model == ItemModel::Note && i.object_id == note)
        .map(|i| i.id)
        .collect();
    for pin in pins {
        doc.remove_item(pin);
    }
    Ok(())
}
