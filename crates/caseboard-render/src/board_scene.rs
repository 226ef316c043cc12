//! Build the scene tree for a board.

use crate::scene::{Element, Scene, VIEWPORT_ID, transform_attr};
use caseboard_core::geometry::{EDGE_HIT_WIDTH, EDGE_STROKE_WIDTH, NODE_SIZE};
use caseboard_core::{BoardItem, BoardView, Camera, EdgeGeometry, NodeState, SerializableColor};
use kurbo::Rect;

/// Space kept around the nodes when measuring the scene.
pub const SCENE_MARGIN: f64 = 24.0;

const ARROW_ID: &str = "arrow";
const CORNER_RADIUS: f64 = 8.0;
const ACCENT_WIDTH: f64 = 6.0;
const CONTROL_RADIUS: f64 = 7.0;

/// Class name for a node presentation state, if any.
pub fn state_class(state: NodeState) -> Option<&'static str> {
    match state {
        NodeState::Idle => None,
        NodeState::Selected => Some("selected"),
        NodeState::Dragging => Some("dragging"),
        NodeState::DraftSource => Some("draft-source"),
        NodeState::DraftTarget => Some("draft-target"),
    }
}

/// Render `view` under the camera transform.
///
/// Edges are painted above nodes so their hit lines receive pointer input.
pub fn build_scene(view: &BoardView, camera: &Camera) -> Scene {
    let mut nodes = Element::new("g").with_class("nodes");
    for item in &view.items {
        nodes.push(node_element(view, item));
    }

    let mut edges = Element::new("g").with_class("edges");
    for edge in view.edges() {
        edges.push(edge_element(&edge));
    }

    let mut viewport = Element::new("g")
        .with_attr("id", VIEWPORT_ID)
        .with_child(nodes)
        .with_child(edges);
    if !camera.is_identity() {
        viewport.set_attr("transform", transform_attr(camera.transform()));
    }

    let root = Element::new("g")
        .with_attr("id", "board")
        .with_child(Element::new("defs").with_child(arrow_marker()))
        .with_child(viewport);

    let bounds = view
        .content_bounds()
        .map(|b| b.inflate(SCENE_MARGIN, SCENE_MARGIN))
        .unwrap_or(Rect::ZERO);
    Scene::new(root, bounds)
}

fn arrow_marker() -> Element {
    Element::new("marker")
        .with_attr("id", ARROW_ID)
        .with_attr("viewBox", "0 0 10 10")
        .with_attr("refX", 9)
        .with_attr("refY", 5)
        .with_attr("markerWidth", 8)
        .with_attr("markerHeight", 8)
        .with_attr("orient", "auto")
        .with_child(
            Element::new("path")
                .with_class("edge-arrow")
                .with_attr("d", "M 0 0 L 10 5 L 0 10 z"),
        )
}

fn node_element(view: &BoardView, item: &BoardItem) -> Element {
    let origin = view.display_position(item);
    let mut group = Element::new("g")
        .with_class("node")
        .with_class(&format!("model-{}", item.model.tag()))
        .with_attr("data-item", item.id)
        .with_attr("transform", format!("translate({} {})", origin.x, origin.y));
    if let Some(class) = state_class(view.node_state(item.id)) {
        group.add_class(class);
    }

    let accent = SerializableColor::from(item.model.accent()).to_hex();
    group
        .with_child(
            Element::new("rect")
                .with_class("node-body")
                .with_attr("width", NODE_SIZE.width)
                .with_attr("height", NODE_SIZE.height)
                .with_attr("rx", CORNER_RADIUS),
        )
        .with_child(
            Element::new("rect")
                .with_class("node-accent")
                .with_attr("width", ACCENT_WIDTH)
                .with_attr("height", NODE_SIZE.height)
                .with_attr("fill", accent),
        )
        .with_child(
            Element::new("text")
                .with_class("node-icon")
                .with_attr("x", 18)
                .with_attr("y", 32)
                .with_text(item.model.icon()),
        )
        .with_child(
            Element::new("text")
                .with_class("node-title")
                .with_attr("x", 40)
                .with_attr("y", 32)
                .with_text(item.display_name.clone()),
        )
        .with_child(
            Element::new("text")
                .with_class("node-model")
                .with_attr("x", 40)
                .with_attr("y", 58)
                .with_text(item.model.tag()),
        )
        .with_child(
            // Presses on this control never start a drag.
            Element::new("circle")
                .with_class("node-control")
                .with_attr("data-action", "connect")
                .with_attr("cx", NODE_SIZE.width - 14.0)
                .with_attr("cy", 14)
                .with_attr("r", CONTROL_RADIUS),
        )
}

fn line(edge: &EdgeGeometry) -> Element {
    let l = edge.line;
    Element::new("line")
        .with_attr("x1", l.p0.x)
        .with_attr("y1", l.p0.y)
        .with_attr("x2", l.p1.x)
        .with_attr("y2", l.p1.y)
}

fn edge_element(edge: &EdgeGeometry) -> Element {
    let mut group = Element::new("g")
        .with_class("edge")
        .with_attr("data-connection", edge.connection)
        .with_child(
            line(edge)
                .with_class("edge-hit")
                .with_attr("stroke-width", EDGE_HIT_WIDTH),
        )
        .with_child(
            line(edge)
                .with_class("edge-line")
                .with_attr("stroke-width", EDGE_STROKE_WIDTH)
                .with_attr("marker-end", format!("url(#{ARROW_ID})")),
        );
    if let Some(label) = &edge.label {
        group.push(
            Element::new("text")
                .with_class("edge-label")
                .with_attr("x", label.anchor.x)
                .with_attr("y", label.anchor.y)
                .with_attr("text-anchor", "middle")
                .with_text(label.text.clone()),
        );
    }
    group
}
