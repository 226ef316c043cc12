//! In-memory client implementation.

use super::{
    BoardClient, BoxFuture, ClientError, ClientResult, apply_connect, apply_create_note,
    apply_delete_note, apply_disconnect, apply_move, apply_unpin, apply_update_note,
};
use crate::model::{
    BoardConnection, BoardDocument, BoardId, BoardItem, ConnectionId, ItemId, Note, NoteDraft,
    NoteId, RecordRef,
};
use kurbo::Point;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

/// Client operations, used to script failures in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    ListItems,
    ListConnections,
    UpdateItemPosition,
    PinRecord,
    UnpinItem,
    CreateConnection,
    DeleteConnection,
    ListNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
}

/// In-memory store for testing and ephemeral boards.
#[derive(Default)]
pub struct MemoryClient {
    boards: RwLock<HashMap<BoardId, BoardDocument>>,
    failures: Mutex<HashSet<ClientOp>>,
    calls: Mutex<HashMap<ClientOp, usize>>,
}

impl MemoryClient {
    /// Create a new empty memory client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client already holding `document`.
    pub fn with_board(document: BoardDocument) -> Self {
        let client = Self::new();
        client.insert_board(document);
        client
    }

    pub fn insert_board(&self, document: BoardDocument) {
        self.boards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.id, document);
    }

    /// Server-side copy of a board.
    pub fn document(&self, board: BoardId) -> Option<BoardDocument> {
        self.boards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&board)
            .cloned()
    }

    /// Make the next call of `op` fail with [`ClientError::Rejected`].
    pub fn fail_next(&self, op: ClientOp) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    /// How many times `op` was called.
    pub fn calls(&self, op: ClientOp) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    fn with_doc<T>(
        &self,
        op: ClientOp,
        board: BoardId,
        f: impl FnOnce(&mut BoardDocument) -> ClientResult<T>,
    ) -> ClientResult<T> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_default() += 1;

        if self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op)
        {
            return Err(ClientError::Rejected(format!("{op:?} failed")));
        }

        let mut boards = self.boards.write().map_err(|e| {
            ClientError::Other(format!("Lock error: {}", e))
        })?;
        let doc = boards
            .get_mut(&board)
            .ok_or_else(|| ClientError::NotFound(format!("board {board}")))?;
        f(doc)
    }
}

impl BoardClient for MemoryClient {
    fn list_items(&self, board: BoardId) -> BoxFuture<'_, ClientResult<Vec<BoardItem>>> {
        Box::pin(async move {
            self.with_doc(ClientOp::ListItems, board, |doc| Ok(doc.items.clone()))
        })
    }

    fn list_connections(
        &self,
        board: BoardId,
    ) -> BoxFuture<'_, ClientResult<Vec<BoardConnection>>> {
        Box::pin(async move {
            self.with_doc(ClientOp::ListConnections, board, |doc| {
                Ok(doc.connections.clone())
            })
        })
    }

    fn update_item_position(
        &self,
        board: BoardId,
        item: ItemId,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<BoardItem>> {
        Box::pin(async move {
            self.with_doc(ClientOp::UpdateItemPosition, board, |doc| {
                apply_move(doc, item, position)
            })
        })
    }

    fn pin_record(
        &self,
        board: BoardId,
        record: RecordRef,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<BoardItem>> {
        Box::pin(async move {
            self.with_doc(ClientOp::PinRecord, board, |doc| {
                Ok(doc.add_item(position, record))
            })
        })
    }

    fn unpin_item(&self, board: BoardId, item: ItemId) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            self.with_doc(ClientOp::UnpinItem, board, |doc| apply_unpin(doc, item))
        })
    }

    fn create_connection(
        &self,
        board: BoardId,
        from: ItemId,
        to: ItemId,
        label: Option<String>,
    ) -> BoxFuture<'_, ClientResult<BoardConnection>> {
        Box::pin(async move {
            self.with_doc(ClientOp::CreateConnection, board, |doc| {
                apply_connect(doc, from, to, label)
            })
        })
    }

    fn delete_connection(
        &self,
        board: BoardId,
        connection: ConnectionId,
    ) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            self.with_doc(ClientOp::DeleteConnection, board, |doc| {
                apply_disconnect(doc, connection)
            })
        })
    }

    fn list_notes(&self, board: BoardId) -> BoxFuture<'_, ClientResult<Vec<Note>>> {
        Box::pin(async move {
            self.with_doc(ClientOp::ListNotes, board, |doc| Ok(doc.notes.clone()))
        })
    }

    fn create_note(
        &self,
        board: BoardId,
        draft: NoteDraft,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<(Note, BoardItem)>> {
        Box::pin(async move {
            self.with_doc(ClientOp::CreateNote, board, |doc| {
                apply_create_note(doc, draft, position)
            })
        })
    }

    fn update_note(
        &self,
        board: BoardId,
        note: NoteId,
        draft: NoteDraft,
    ) -> BoxFuture<'_, ClientResult<Note>> {
        Box::pin(async move {
            self.with_doc(ClientOp::UpdateNote, board, |doc| {
                apply_update_note(doc, note, draft)
            })
        })
    }

    fn delete_note(&self, board: BoardId, note: NoteId) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            self.with_doc(ClientOp::DeleteNote, board, |doc| apply_delete_note(doc, note))
        })
    }
}
