//! Board data model: pins, connections, notes.

use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a board.
pub type BoardId = u64;
/// Identifier of a pinned item.
pub type ItemId = u64;
/// Identifier of a connection.
pub type ConnectionId = u64;
/// Identifier of a note.
pub type NoteId = u64;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Whether the color has no transparency.
    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// CSS hex notation (`#rrggbb`), alpha dropped.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Kind of domain record a pin refers to.
///
/// Unknown tags are preserved verbatim so a newer server can introduce
/// record kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemModel {
    Evidence,
    Suspect,
    Case,
    Note,
    Other(String),
}

impl ItemModel {
    /// Wire tag of this model.
    pub fn tag(&self) -> &str {
        match self {
            ItemModel::Evidence => "evidence",
            ItemModel::Suspect => "suspect",
            ItemModel::Case => "case",
            ItemModel::Note => "note",
            ItemModel::Other(tag) => tag,
        }
    }

    /// Icon glyph shown on the node.
    pub fn icon(&self) -> &'static str {
        match self {
            ItemModel::Evidence => "\u{1F50E}",
            ItemModel::Suspect => "\u{1F464}",
            ItemModel::Case => "\u{1F4C1}",
            ItemModel::Note => "\u{1F4DD}",
            ItemModel::Other(_) => "\u{1F4CC}",
        }
    }

    /// Accent color of the node header.
    pub fn accent(&self) -> Color {
        match self {
            ItemModel::Evidence => Color::from_rgba8(37, 99, 235, 255),
            ItemModel::Suspect => Color::from_rgba8(220, 38, 38, 255),
            ItemModel::Case => Color::from_rgba8(22, 163, 74, 255),
            ItemModel::Note => Color::from_rgba8(202, 138, 4, 255),
            ItemModel::Other(_) => Color::from_rgba8(107, 114, 128, 255),
        }
    }

    /// Whether the tag was recognised.
    pub fn is_known(&self) -> bool {
        !matches!(self, ItemModel::Other(_))
    }
}

impl From<String> for ItemModel {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "evidence" => ItemModel::Evidence,
            "suspect" => ItemModel::Suspect,
            "case" => ItemModel::Case,
            "note" => ItemModel::Note,
            _ => ItemModel::Other(tag),
        }
    }
}

impl From<&str> for ItemModel {
    fn from(tag: &str) -> Self {
        ItemModel::from(tag.to_string())
    }
}

impl From<ItemModel> for String {
    fn from(model: ItemModel) -> Self {
        model.tag().to_string()
    }
}

impl fmt::Display for ItemModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reference to a domain record owned by another subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub object_id: u64,
    pub model: ItemModel,
    pub display_name: String,
}

impl RecordRef {
    pub fn new(
        object_id: u64,
        model: impl Into<ItemModel>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            object_id,
            model: model.into(),
            display_name: display_name.into(),
        }
    }
}

/// A pin on the board. `x`/`y` is the top-left corner in canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: ItemId,
    pub x: f64,
    pub y: f64,
    pub object_id: u64,
    pub model: ItemModel,
    pub display_name: String,
}

impl BoardItem {
    pub fn new(id: ItemId, position: Point, record: RecordRef) -> Self {
        Self {
            id,
            x: position.x,
            y: position.y,
            object_id: record.object_id,
            model: record.model,
            display_name: record.display_name,
        }
    }

    /// Committed top-left position.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }
}

/// A directed edge between two pins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConnection {
    pub id: ConnectionId,
    pub from_item: ItemId,
    pub to_item: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BoardConnection {
    pub fn new(id: ConnectionId, from_item: ItemId, to_item: ItemId) -> Self {
        Self {
            id,
            from_item,
            to_item,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether both ends point at the same item.
    pub fn is_self_loop(&self) -> bool {
        self.from_item == self.to_item
    }
}

/// A free-form note attached to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub case_id: u64,
    pub title: String,
    pub content: String,
}

/// Fields of a note supplied by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Everything persisted for a single board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    pub id: BoardId,
    /// Case the board belongs to; notes are scoped to it.
    #[serde(default)]
    pub case_id: u64,
    #[serde(default)]
    pub items: Vec<BoardItem>,
    #[serde(default)]
    pub connections: Vec<BoardConnection>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default = "first_id")]
    pub next_item_id: ItemId,
    #[serde(default = "first_id")]
    pub next_connection_id: ConnectionId,
    #[serde(default = "first_id")]
    pub next_note_id: NoteId,
}

fn first_id() -> u64 {
    1
}

impl BoardDocument {
    /// Create an empty board.
    pub fn new(id: BoardId, case_id: u64) -> Self {
        Self {
            id,
            case_id,
            items: Vec::new(),
            connections: Vec::new(),
            notes: Vec::new(),
            next_item_id: 1,
            next_connection_id: 1,
            next_note_id: 1,
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&BoardItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut BoardItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Pin a record at a position and return the new item.
    pub fn add_item(&mut self, position: Point, record: RecordRef) -> BoardItem {
        let item = BoardItem::new(self.next_item_id, position, record);
        self.next_item_id += 1;
        self.items.push(item.clone());
        item
    }

    /// Remove an item together with every connection touching it.
    pub fn remove_item(&mut self, id: ItemId) -> Option<BoardItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        self.connections
            .retain(|c| c.from_item != id && c.to_item != id);
        Some(self.items.remove(index))
    }

    pub fn add_connection(
        &mut self,
        from_item: ItemId,
        to_item: ItemId,
        label: Option<String>,
    ) -> BoardConnection {
        let connection = BoardConnection {
            id: self.next_connection_id,
            from_item,
            to_item,
            label,
        };
        self.next_connection_id += 1;
        self.connections.push(connection.clone());
        connection
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<BoardConnection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(index))
    }

    pub fn add_note(&mut self, draft: NoteDraft) -> Note {
        let note = Note {
            id: self.next_note_id,
            case_id: self.case_id,
            title: draft.title,
            content: draft.content,
        };
        self.next_note_id += 1;
        self.notes.push(note.clone());
        note
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_tags_roundtrip_through_strings() {
        assert_eq!(ItemModel::from("evidence"), ItemModel::Evidence);
        assert_eq!(ItemModel::from("vehicle"), ItemModel::Other("vehicle".into()));
        assert_eq!(String::from(ItemModel::Suspect), "suspect");
    }

    #[test]
    fn test_unknown_model_falls_back_to_generic_icon() {
        let unknown = ItemModel::from("vehicle");
        assert!(!unknown.is_known());
        assert_eq!(unknown.icon(), ItemModel::Other(String::new()).icon());
        assert_ne!(unknown.icon(), ItemModel::Evidence.icon());
    }

    #[test]
    fn test_item_serializes_model_as_tag() {
        let item = BoardItem::new(
            3,
            Point::new(10.0, 20.0),
            RecordRef::new(7, "evidence", "Knife"),
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["model"], "evidence");
        assert_eq!(json["display_name"], "Knife");
    }

    #[test]
    fn test_remove_item_drops_touching_connections() {
        let mut doc = BoardDocument::new(1, 1);
        let a = doc.add_item(Point::new(0.0, 0.0), RecordRef::new(1, "case", "A"));
        let b = doc.add_item(Point::new(0.0, 0.0), RecordRef::new(2, "case", "B"));
        let c = doc.add_item(Point::new(0.0, 0.0), RecordRef::new(3, "case", "C"));
        doc.add_connection(a.id, b.id, None);
        doc.add_connection(b.id, c.id, None);

        doc.remove_item(a.id);

        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.connections.len(), 1);
        assert_eq!(doc.connections[0].from_item, b.id);
    }

    #[test]
    fn test_document_json_roundtrip() {
        let mut doc = BoardDocument::new(4, 9);
        let a = doc.add_item(Point::new(1.0, 2.0), RecordRef::new(1, "suspect", "Ann"));
        let b = doc.add_item(Point::new(3.0, 4.0), RecordRef::new(2, "note", "Hunch"));
        doc.add_connection(a.id, b.id, Some("knows".into()));

        let loaded = BoardDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(SerializableColor::new(255, 0, 16, 255).to_hex(), "#ff0010");
        assert!(SerializableColor::white().is_opaque());
    }
}
