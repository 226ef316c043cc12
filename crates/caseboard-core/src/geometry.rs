//! Node centers, edge segments and hit testing.
//!
//! Everything here is a pure function of committed item positions plus an
//! optional display override for the node currently being dragged.

use crate::model::{BoardConnection, BoardItem, ConnectionId, ItemId};
use kurbo::{Line, Point, Rect, Size};

/// Size of every node on the board, in canvas units.
///
/// The scene builder draws nodes with this exact size; edges attach to the
/// node center derived from it.
pub const NODE_SIZE: Size = Size::new(180.0, 80.0);

/// Width of the invisible line used for edge hit testing.
pub const EDGE_HIT_WIDTH: f64 = 12.0;

/// Width of the visible edge stroke.
pub const EDGE_STROKE_WIDTH: f64 = 2.0;

/// How far a label sits above the edge midpoint.
pub const LABEL_OFFSET: f64 = 8.0;

/// Display-only position of the node being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOverride {
    pub item: ItemId,
    pub position: Point,
}

/// Position an item should be drawn at, honouring the drag override.
pub fn display_position(item: &BoardItem, overlay: Option<PositionOverride>) -> Point {
    match overlay {
        Some(o) if o.item == item.id => o.position,
        _ => item.position(),
    }
}

/// Center of a node whose top-left corner is `origin`.
pub fn node_center(origin: Point) -> Point {
    Point::new(
        origin.x + NODE_SIZE.width / 2.0,
        origin.y + NODE_SIZE.height / 2.0,
    )
}

/// Rectangle of a node whose top-left corner is `origin`.
pub fn node_rect(origin: Point) -> Rect {
    Rect::from_origin_size(origin, NODE_SIZE)
}

/// Resolved geometry of one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub connection: ConnectionId,
    pub from_item: ItemId,
    pub to_item: ItemId,
    /// Segment from source center to target center.
    pub line: Line,
    pub label: Option<EdgeLabel>,
}

/// A label anchored above the edge midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLabel {
    pub text: String,
    pub anchor: Point,
}

impl EdgeGeometry {
    /// Whether `point` falls on the wide hit line.
    pub fn hit_test(&self, point: Point) -> bool {
        point_to_segment_dist(point, self.line.p0, self.line.p1) <= EDGE_HIT_WIDTH / 2.0
    }
}

/// Label anchor: segment midpoint moved up by [`LABEL_OFFSET`].
pub fn label_anchor(line: Line) -> Point {
    let mid = line.midpoint();
    Point::new(mid.x, mid.y - LABEL_OFFSET)
}

/// Geometry for a single connection.
///
/// Returns `None` when either endpoint is not in `items` or when the
/// connection loops back onto its own source.
pub fn edge_geometry(
    connection: &BoardConnection,
    items: &[BoardItem],
    overlay: Option<PositionOverride>,
) -> Option<EdgeGeometry> {
    if connection.is_self_loop() {
        return None;
    }
    let from = items.iter().find(|i| i.id == connection.from_item)?;
    let to = items.iter().find(|i| i.id == connection.to_item)?;

    let line = Line::new(
        node_center(display_position(from, overlay)),
        node_center(display_position(to, overlay)),
    );
    let label = connection
        .label
        .as_ref()
        .filter(|text| !text.is_empty())
        .map(|text| EdgeLabel {
            text: text.clone(),
            anchor: label_anchor(line),
        });

    Some(EdgeGeometry {
        connection: connection.id,
        from_item: connection.from_item,
        to_item: connection.to_item,
        line,
        label,
    })
}

/// Geometry for every drawable connection, in input order.
pub fn edges(
    connections: &[BoardConnection],
    items: &[BoardItem],
    overlay: Option<PositionOverride>,
) -> Vec<EdgeGeometry> {
    connections
        .iter()
        .filter_map(|connection| {
            let edge = edge_geometry(connection, items, overlay);
            if edge.is_none() {
                log::debug!(
                    "skipping connection {} ({} -> {}): endpoint unresolved",
                    connection.id,
                    connection.from_item,
                    connection.to_item
                );
            }
            edge
        })
        .collect()
}

/// Topmost item under `point`. Later items paint over earlier ones.
pub fn hit_test_item(
    point: Point,
    items: &[BoardItem],
    overlay: Option<PositionOverride>,
) -> Option<ItemId> {
    items
        .iter()
        .rev()
        .find(|item| node_rect(display_position(item, overlay)).contains(point))
        .map(|item| item.id)
}

/// Topmost connection whose hit line is under `point`.
pub fn hit_test_connection(point: Point, edges: &[EdgeGeometry]) -> Option<ConnectionId> {
    edges
        .iter()
        .rev()
        .find(|edge| edge.hit_test(point))
        .map(|edge| edge.connection)
}

/// Distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordRef;
    use proptest::prelude::*;

    fn item(id: ItemId, x: f64, y: f64) -> BoardItem {
        BoardItem::new(id, Point::new(x, y), RecordRef::new(id, "evidence", "x"))
    }

    #[test]
    fn test_edge_endpoints_are_node_centers() {
        let items = vec![item(1, 100.0, 100.0), item(2, 300.0, 100.0)];
        let conn = BoardConnection::new(10, 1, 2);

        let edge = edge_geometry(&conn, &items, None).unwrap();

        assert_eq!(edge.line.p0, Point::new(190.0, 140.0));
        assert_eq!(edge.line.p1, Point::new(390.0, 140.0));
    }

    #[test]
    fn test_label_sits_above_midpoint() {
        let items = vec![item(1, 100.0, 100.0), item(2, 300.0, 100.0)];
        let conn = BoardConnection::new(10, 1, 2).with_label("owns");

        let edge = edge_geometry(&conn, &items, None).unwrap();
        let label = edge.label.unwrap();

        assert_eq!(label.text, "owns");
        assert_eq!(label.anchor, Point::new(290.0, 140.0 - LABEL_OFFSET));
    }

    #[test]
    fn test_empty_label_is_dropped() {
        let items = vec![item(1, 0.0, 0.0), item(2, 300.0, 0.0)];
        let conn = BoardConnection::new(10, 1, 2).with_label("");
        assert!(edge_geometry(&conn, &items, None).unwrap().label.is_none());
    }

    #[test]
    fn test_stale_and_self_loop_edges_are_skipped() {
        let items = vec![item(1, 0.0, 0.0), item(2, 300.0, 0.0)];
        let connections = vec![
            BoardConnection::new(1, 1, 2),
            BoardConnection::new(2, 1, 99),
            BoardConnection::new(3, 98, 2),
            BoardConnection::new(4, 2, 2),
        ];

        let drawn = edges(&connections, &items, None);

        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].connection, 1);
    }

    #[test]
    fn test_override_moves_only_dragged_node() {
        let items = vec![item(1, 0.0, 0.0), item(2, 300.0, 0.0)];
        let conn = BoardConnection::new(1, 1, 2);
        let overlay = PositionOverride {
            item: 1,
            position: Point::new(50.0, 50.0),
        };

        let edge = edge_geometry(&conn, &items, Some(overlay)).unwrap();

        assert_eq!(edge.line.p0, Point::new(140.0, 90.0));
        assert_eq!(edge.line.p1, Point::new(390.0, 40.0));
    }

    #[test]
    fn test_hit_test_item_prefers_topmost() {
        let items = vec![item(1, 0.0, 0.0), item(2, 100.0, 40.0)];
        assert_eq!(hit_test_item(Point::new(150.0, 60.0), &items, None), Some(2));
        assert_eq!(hit_test_item(Point::new(10.0, 10.0), &items, None), Some(1));
        assert_eq!(hit_test_item(Point::new(500.0, 500.0), &items, None), None);
    }

    #[test]
    fn test_hit_line_is_wider_than_stroke() {
        let items = vec![item(1, 0.0, 0.0), item(2, 400.0, 0.0)];
        let drawn = edges(&[BoardConnection::new(7, 1, 2)], &items, None);

        // 5px off the line: outside the visible stroke, inside the hit line.
        assert_eq!(hit_test_connection(Point::new(300.0, 45.0), &drawn), Some(7));
        assert_eq!(hit_test_connection(Point::new(300.0, 47.0), &drawn), None);
    }

    proptest! {
        #[test]
        fn prop_rendering_omits_unresolved_edges(
            item_ids in proptest::collection::btree_set(0u64..20, 0..10),
            pairs in proptest::collection::vec((0u64..25, 0u64..25), 0..30),
        ) {
            let items: Vec<BoardItem> = item_ids
                .iter()
                .map(|&id| item(id, id as f64 * 10.0, 0.0))
                .collect();
            let connections: Vec<BoardConnection> = pairs
                .iter()
                .enumerate()
                .map(|(i, &(from, to))| BoardConnection::new(i as u64, from, to))
                .collect();

            let drawn = edges(&connections, &items, None);

            for edge in &drawn {
                prop_assert!(item_ids.contains(&edge.from_item));
                prop_assert!(item_ids.contains(&edge.to_item));
            }
            let expected = connections
                .iter()
                .filter(|c| {
                    c.from_item != c.to_item
                        && item_ids.contains(&c.from_item)
                        && item_ids.contains(&c.to_item)
                })
                .count();
            prop_assert_eq!(drawn.len(), expected);
        }
    }
}
