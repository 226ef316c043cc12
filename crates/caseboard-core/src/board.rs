//! Board session: interaction state, caches and persistence for one board.

use crate::cache::{MutationError, OptimisticMutation, QueryCache, QueryKey};
use crate::client::{BoardClient, ClientError};
use crate::draft::DraftState;
use crate::drag::{MouseButton, PointerTarget};
use crate::interaction::{BoardEvent, BoardInteraction, Command};
use crate::model::{
    BoardConnection, BoardId, BoardItem, ConnectionId, ItemId, Note, NoteDraft, NoteId, RecordRef,
};
use crate::view::BoardView;
use kurbo::Point;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Board operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("A connection cannot start and end on the same item")]
    SelfLoop,
    #[error("Item {0} is not on this board")]
    UnknownItem(ItemId),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Transient user-facing message, e.g. a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// One open board.
///
/// Reads come from the local caches. Moves, connection removal and note
/// edits are applied optimistically; pins, notes and connections are
/// created only after the server confirms them.
pub struct BoardSession<C: BoardClient> {
    board: BoardId,
    client: Arc<C>,
    items: QueryCache<QueryKey, Vec<BoardItem>>,
    connections: QueryCache<QueryKey, Vec<BoardConnection>>,
    notes: QueryCache<QueryKey, Vec<Note>>,
    interaction: BoardInteraction,
    notices: Mutex<VecDeque<Notice>>,
}

impl<C: BoardClient> BoardSession<C> {
    pub fn new(board: BoardId, client: Arc<C>) -> Self {
        Self {
            board,
            client,
            items: QueryCache::new(),
            connections: QueryCache::new(),
            notes: QueryCache::new(),
            interaction: BoardInteraction::new(),
            notices: Mutex::new(VecDeque::new()),
        }
    }

    pub fn board(&self) -> BoardId {
        self.board
    }

    fn items_key(&self) -> QueryKey {
        QueryKey::BoardItems(self.board)
    }

    fn connections_key(&self) -> QueryKey {
        QueryKey::BoardConnections(self.board)
    }

    fn notes_key(&self) -> QueryKey {
        QueryKey::BoardNotes(self.board)
    }

    /// Fetch items, connections and notes.
    pub async fn load(&self) -> BoardResult<()> {
        self.refresh_items().await?;
        self.refresh_connections().await?;
        self.refresh_notes().await?;
        log::info!("board {} loaded", self.board);
        Ok(())
    }

    async fn refresh_items(&self) -> BoardResult<()> {
        let key = self.items_key();
        self.items.invalidate(&key);
        self.items
            .fetch(key, self.client.list_items(self.board))
            .await?;
        Ok(())
    }

    async fn refresh_connections(&self) -> BoardResult<()> {
        let key = self.connections_key();
        self.connections.invalidate(&key);
        self.connections
            .fetch(key, self.client.list_connections(self.board))
            .await?;
        Ok(())
    }

    async fn refresh_notes(&self) -> BoardResult<()> {
        let key = self.notes_key();
        self.notes.invalidate(&key);
        self.notes
            .fetch(key, self.client.list_notes(self.board))
            .await?;
        Ok(())
    }

    /// Resync after a confirmed change; failures only leave the key stale.
    async fn resync(&self, refreshes: &[QueryKey]) {
        for key in refreshes {
            let result = match key {
                QueryKey::BoardItems(_) => self.refresh_items().await,
                QueryKey::BoardConnections(_) => self.refresh_connections().await,
                QueryKey::BoardNotes(_) => self.refresh_notes().await,
            };
            if let Err(e) = result {
                log::error!("resync of {key:?} failed: {e}");
            }
        }
    }

    pub fn items(&self) -> Vec<BoardItem> {
        self.items.get(&self.items_key()).unwrap_or_default()
    }

    pub fn connections(&self) -> Vec<BoardConnection> {
        self.connections
            .get(&self.connections_key())
            .unwrap_or_default()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.get(&self.notes_key()).unwrap_or_default()
    }

    pub fn interaction(&self) -> &BoardInteraction {
        &self.interaction
    }

    /// Snapshot for the renderer.
    pub fn view(&self) -> BoardView {
        BoardView::new(self.items(), self.connections()).with_interaction(&self.interaction)
    }

    /// Whether a move is still being saved; drag start should be disabled.
    pub fn is_saving_items(&self) -> bool {
        self.items.is_mutating(&self.items_key())
    }

    pub fn is_saving_connections(&self) -> bool {
        self.connections.is_mutating(&self.connections_key())
    }

    pub fn is_saving_notes(&self) -> bool {
        self.notes.is_mutating(&self.notes_key())
    }

    /// Drain pending notices.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    fn notify<T>(&self, action: &str, result: BoardResult<T>) -> BoardResult<T> {
        if let Err(e) = &result {
            log::warn!("{action} failed: {e}");
            self.notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Notice {
                    message: format!("Could not {action}: {e}"),
                });
        }
        result
    }

    /// Pointer press on a node, filling in its committed position.
    pub async fn press(
        &mut self,
        item: ItemId,
        pointer: Point,
        button: MouseButton,
        target: PointerTarget,
    ) -> BoardResult<()> {
        let origin = self
            .items()
            .iter()
            .find(|i| i.id == item)
            .map(BoardItem::position)
            .ok_or(BoardError::UnknownItem(item))?;
        self.handle(BoardEvent::PointerDown {
            item,
            pointer,
            origin,
            button,
            target,
        })
        .await
    }

    /// Dispatch an input event and persist whatever it commits.
    pub async fn handle(&mut self, event: BoardEvent) -> BoardResult<()> {
        // A drafting click does not touch positions, so only drags wait.
        if matches!(event, BoardEvent::PointerDown { .. })
            && self.interaction.draft_state() == DraftState::Idle
            && self.is_saving_items()
        {
            log::debug!("ignoring drag start while a move is being saved");
            return Ok(());
        }
        let Some(command) = self.interaction.dispatch(event) else {
            return Ok(());
        };
        match command {
            Command::CommitPosition { item, position } => {
                self.move_item(item, position).await.map(|_| ())
            }
            Command::CreateConnection(request) => self
                .create_connection(request.from, request.to, None)
                .await
                .map(|_| ()),
            Command::DeleteConnection(id) => self.delete_connection(id).await,
        }
    }

    /// Move an item, reflecting the new position immediately.
    pub async fn move_item(&self, item: ItemId, position: Point) -> BoardResult<BoardItem> {
        let result = OptimisticMutation::new(
            &self.items,
            self.items_key(),
            |items: &Vec<BoardItem>, &(id, position): &(ItemId, Point)| {
                let mut next = items.clone();
                next.iter_mut().find(|i| i.id == id)?.set_position(position);
                Some(next)
            },
        )
        .on_success(|stored: &BoardItem| {
            log::info!("item {} saved at ({}, {})", stored.id, stored.x, stored.y)
        })
        .run(
            (item, position),
            |(id, position)| self.client.update_item_position(self.board, id, position),
            || self.client.list_items(self.board),
        )
        .await
        .map_err(BoardError::from);
        self.notify("move item", result)
    }

    /// Remove a connection, hiding it immediately.
    pub async fn delete_connection(&self, connection: ConnectionId) -> BoardResult<()> {
        let result = OptimisticMutation::new(
            &self.connections,
            self.connections_key(),
            |connections: &Vec<BoardConnection>, &id: &ConnectionId| {
                connections.iter().any(|c| c.id == id).then(|| {
                    connections
                        .iter()
                        .filter(|c| c.id != id)
                        .cloned()
                        .collect()
                })
            },
        )
        .run(
            connection,
            |id| self.client.delete_connection(self.board, id),
            || self.client.list_connections(self.board),
        )
        .await
        .map_err(BoardError::from);
        self.notify("remove connection", result)
    }

    /// Create a connection once the server has assigned it an id.
    pub async fn create_connection(
        &self,
        from: ItemId,
        to: ItemId,
        label: Option<String>,
    ) -> BoardResult<BoardConnection> {
        let result = self.try_create_connection(from, to, label).await;
        self.notify("create connection", result)
    }

    async fn try_create_connection(
        &self,
        from: ItemId,
        to: ItemId,
        label: Option<String>,
    ) -> BoardResult<BoardConnection> {
        if from == to {
            return Err(BoardError::SelfLoop);
        }
        let items = self.items();
        for end in [from, to] {
            if !items.iter().any(|i| i.id == end) {
                return Err(BoardError::UnknownItem(end));
            }
        }
        let connection = self
            .client
            .create_connection(self.board, from, to, label)
            .await?;
        log::info!("connection {} created: {from} -> {to}", connection.id);
        self.resync(&[self.connections_key()]).await;
        Ok(connection)
    }

    /// Pin a record at `position`.
    pub async fn pin_record(&self, record: RecordRef, position: Point) -> BoardResult<BoardItem> {
        let result = self
            .client
            .pin_record(self.board, record, position)
            .await
            .map_err(BoardError::from);
        if result.is_ok() {
            self.resync(&[self.items_key()]).await;
        }
        self.notify("pin record", result)
    }

    /// Remove a pin; its connections go with it.
    pub async fn unpin_item(&mut self, item: ItemId) -> BoardResult<()> {
        let result = self
            .client
            .unpin_item(self.board, item)
            .await
            .map_err(BoardError::from);
        if result.is_ok() {
            self.interaction.deselect(item);
            self.resync(&[self.items_key(), self.connections_key()]).await;
        }
        self.notify("unpin item", result)
    }

    /// Create a note and its pin.
    pub async fn create_note(&self, draft: NoteDraft, position: Point) -> BoardResult<Note> {
        let result = self
            .client
            .create_note(self.board, draft, position)
            .await
            .map(|(note, _pin)| note)
            .map_err(BoardError::from);
        if result.is_ok() {
            self.resync(&[self.notes_key(), self.items_key()]).await;
        }
        self.notify("create note", result)
    }

    /// Edit a note, showing the new text immediately.
    pub async fn update_note(&self, note: NoteId, draft: NoteDraft) -> BoardResult<Note> {
        let result = OptimisticMutation::new(
            &self.notes,
            self.notes_key(),
            |notes: &Vec<Note>, (id, draft): &(NoteId, NoteDraft)| {
                let mut next = notes.clone();
                let target = next.iter_mut().find(|n| n.id == *id)?;
                target.title = draft.title.clone();
                target.content = draft.content.clone();
                Some(next)
            },
        )
        .run(
            (note, draft),
            |(id, draft)| self.client.update_note(self.board, id, draft),
            || self.client.list_notes(self.board),
        )
        .await
        .map_err(BoardError::from);
        if result.is_ok() {
            // Pin captions follow the note title.
            self.resync(&[self.items_key()]).await;
        }
        self.notify("update note", result)
    }

    /// Delete a note, hiding it immediately.
    pub async fn delete_note(&self, note: NoteId) -> BoardResult<()> {
        let result = OptimisticMutation::new(
            &self.notes,
            self.notes_key(),
            |notes: &Vec<Note>, &id: &NoteId| {
                notes
                    .iter()
                    .any(|n| n.id == id)
                    .then(|| notes.iter().filter(|n| n.id != id).cloned().collect())
            },
        )
        .run(
            note,
            |id| self.client.delete_note(self.board, id),
            || self.client.list_notes(self.board),
        )
        .await
        .map_err(BoardError::from);
        if result.is_ok() {
            self.resync(&[self.items_key(), self.connections_key()]).await;
        }
        self.notify("delete note", result)
    }
}
