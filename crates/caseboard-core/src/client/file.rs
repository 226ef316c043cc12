//! File-based client for native platforms.

use super::{
    BoardClient, BoxFuture, ClientError, ClientResult, apply_connect, apply_create_note,
    apply_delete_note, apply_disconnect, apply_move, apply_unpin, apply_update_note,
};
use crate::model::{
    BoardConnection, BoardDocument, BoardId, BoardItem, ConnectionId, ItemId, Note, NoteDraft,
    NoteId, RecordRef,
};
use kurbo::Point;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Stores each board as a pretty-printed JSON file in a directory.
pub struct FileClient {
    /// Base directory for board files.
    base_path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileClient {
    /// Create a client rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> ClientResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                ClientError::Io(format!("Failed to create board directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Create a client in the default location.
    ///
    /// On Unix: `~/.local/share/caseboard/boards/`
    /// On Windows: `%LOCALAPPDATA%\caseboard\boards\`
    pub fn default_location() -> ClientResult<Self> {
        Self::new(Self::default_path()?)
    }

    /// Default board directory.
    pub fn default_path() -> ClientResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| ClientError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("caseboard").join("boards"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn board_path(&self, board: BoardId) -> PathBuf {
        self.base_path.join(format!("board-{board}.json"))
    }

    /// Read a board file.
    pub fn load(&self, board: BoardId) -> ClientResult<BoardDocument> {
        let path = self.board_path(board);
        let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClientError::NotFound(format!("board {board}")),
            _ => ClientError::Io(format!("Failed to read {}: {}", path.display(), e)),
        })?;
        BoardDocument::from_json(&json).map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Write a board file, replacing any previous version.
    pub fn save(&self, document: &BoardDocument) -> ClientResult<()> {
        let json = document
            .to_json()
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        let path = self.board_path(document.id);
        fs::write(&path, json)
            .map_err(|e| ClientError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// IDs of all stored boards.
    pub fn list_boards(&self) -> ClientResult<Vec<BoardId>> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| ClientError::Io(format!("Failed to read board directory: {}", e)))?;
        let mut ids: Vec<BoardId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_prefix("board-")?
                    .strip_suffix(".json")?
                    .parse()
                    .ok()
            })
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn read<T>(
        &self,
        board: BoardId,
        f: impl FnOnce(BoardDocument) -> T,
    ) -> ClientResult<T> {
        self.load(board).map(f)
    }

    fn modify<T>(
        &self,
        board: BoardId,
        f: impl FnOnce(&mut BoardDocument) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.load(board)?;
        let result = f(&mut doc)?;
        self.save(&doc)?;
        Ok(result)
    }
}

impl BoardClient for FileClient {
    fn list_items(&self, board: BoardId) -> BoxFuture<'_, ClientResult<Vec<BoardItem>>> {
        Box::pin(async move { self.read(board, |doc| doc.items) })
    }

    fn list_connections(
        &self,
        board: BoardId,
    ) -> BoxFuture<'_, ClientResult<Vec<BoardConnection>>> {
        Box::pin(async move { self.read(board, |doc| doc.connections) })
    }

    fn update_item_position(
        &self,
        board: BoardId,
        item: ItemId,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<BoardItem>> {
        Box::pin(async move { self.modify(board, |doc| apply_move(doc, item, position)) })
    }

    fn pin_record(
        &self,
        board: BoardId,
        record: RecordRef,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<BoardItem>> {
        Box::pin(async move { self.modify(board, |doc| Ok(doc.add_item(position, record))) })
    }

    fn unpin_item(&self, board: BoardId, item: ItemId) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move { self.modify(board, |doc| apply_unpin(doc, item)) })
    }

    fn create_connection(
        &self,
        board: BoardId,
        from: ItemId,
        to: ItemId,
        label: Option<String>,
    ) -> BoxFuture<'_, ClientResult<BoardConnection>> {
        Box::pin(async move { self.modify(board, |doc| apply_connect(doc, from, to, label)) })
    }

    fn delete_connection(
        &self,
        board: BoardId,
        connection: ConnectionId,
    ) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move { self.modify(board, |doc| apply_disconnect(doc, connection)) })
    }

    fn list_notes(&self, board: BoardId) -> BoxFuture<'_, ClientResult<Vec<Note>>> {
        Box::pin(async move { self.read(board, |doc| doc.notes) })
    }

    fn create_note(
        &self,
        board: BoardId,
        draft: NoteDraft,
        position: Point,
    ) -> BoxFuture<'_, ClientResult<(Note, BoardItem)>> {
        Box::pin(async move { self.modify(board, |doc| apply_create_note(doc, draft, position)) })
    }

    fn update_note(
        &self,
        board: BoardId,
        note: NoteId,
        draft: NoteDraft,
    ) -> BoxFuture<'_, ClientResult<Note>> {
        Box::pin(async move { self.modify(board, |doc| apply_update_note(doc, note, draft)) })
    }

    fn delete_note(&self, board: BoardId, note: NoteId) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move { self.modify(board, |doc| apply_delete_note(doc, note)) })
    }
}
