//! Per-node drag tracking.
//!
//! A [`DragSession`] lives from pointer-down on a node until pointer-up. Moves
//! only produce a display override; a position is committed on release, and
//! only if the pointer travelled further than [`DRAG_THRESHOLD`] on either
//! axis. Anything shorter is a click.

use crate::geometry::PositionOverride;
use crate::model::ItemId;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Per-axis travel (canvas units) that turns a click into a drag.
pub const DRAG_THRESHOLD: f64 = 2.0;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Part of a node the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerTarget {
    /// The node body; drags start here.
    #[default]
    Body,
    /// An embedded control such as the unpin or connect button.
    Control,
}

/// An active pointer drag on one node.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub item: ItemId,
    /// Pointer position at pointer-down.
    pub pointer_start: Point,
    /// Committed node position at pointer-down.
    pub origin: Point,
    /// Pointer travel since pointer-down.
    pub delta: Vec2,
}

impl DragSession {
    pub fn new(item: ItemId, pointer_start: Point, origin: Point) -> Self {
        Self {
            item,
            pointer_start,
            origin,
            delta: Vec2::ZERO,
        }
    }

    /// Track the pointer and return the node's display position.
    pub fn update(&mut self, pointer: Point) -> Point {
        self.delta = pointer - self.pointer_start;
        self.display_position()
    }

    /// Where the node is drawn while the session is active.
    pub fn display_position(&self) -> Point {
        self.origin + self.delta
    }

    /// Whether the current travel exceeds the click threshold.
    pub fn is_drag(&self) -> bool {
        self.delta.x.abs() > DRAG_THRESHOLD || self.delta.y.abs() > DRAG_THRESHOLD
    }

    pub fn overlay(&self) -> PositionOverride {
        PositionOverride {
            item: self.item,
            position: self.display_position(),
        }
    }
}

/// How a drag session ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// Travel stayed within the threshold.
    Click(ItemId),
    /// The node should be committed at `position`.
    Moved { item: ItemId, position: Point },
}

/// Owns the (at most one) drag session of a board.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session. Refused for non-primary buttons, presses on embedded
    /// controls, and while another session is active.
    pub fn begin(
        &mut self,
        item: ItemId,
        pointer: Point,
        committed: Point,
        button: MouseButton,
        target: PointerTarget,
    ) -> bool {
        if button != MouseButton::Left || target == PointerTarget::Control {
            return false;
        }
        if self.session.is_some() {
            return false;
        }
        log::debug!("drag start on item {item} at ({}, {})", pointer.x, pointer.y);
        self.session = Some(DragSession::new(item, pointer, committed));
        true
    }

    /// Track pointer motion; returns the override for the dragged node.
    pub fn pointer_move(&mut self, pointer: Point) -> Option<PositionOverride> {
        let session = self.session.as_mut()?;
        session.update(pointer);
        Some(session.overlay())
    }

    /// Finish the session at `pointer`.
    pub fn end(&mut self, pointer: Point) -> Option<DragOutcome> {
        let mut session = self.session.take()?;
        let position = session.update(pointer);
        if session.is_drag() {
            log::debug!(
                "drag end on item {}: commit ({}, {})",
                session.item,
                position.x,
                position.y
            );
            Some(DragOutcome::Moved {
                item: session.item,
                position,
            })
        } else {
            Some(DragOutcome::Click(session.item))
        }
    }

    /// Abandon the session without committing.
    pub fn cancel(&mut self) -> Option<DragSession> {
        self.session.take()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Display override for the dragged node, if any.
    pub fn overlay(&self) -> Option<PositionOverride> {
        self.session.as_ref().map(DragSession::overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn begin(controller: &mut DragController) -> bool {
        controller.begin(
            1,
            Point::new(120.0, 130.0),
            Point::new(100.0, 100.0),
            MouseButton::Left,
            PointerTarget::Body,
        )
    }

    #[test]
    fn test_drag_commits_absolute_position() {
        let mut controller = DragController::new();
        assert!(begin(&mut controller));

        controller.pointer_move(Point::new(123.0, 128.0));
        let outcome = controller.end(Point::new(125.0, 127.0));

        assert_eq!(
            outcome,
            Some(DragOutcome::Moved {
                item: 1,
                position: Point::new(105.0, 97.0)
            })
        );
        assert!(!controller.is_active());
    }

    #[test]
    fn test_small_move_is_click() {
        let mut controller = DragController::new();
        begin(&mut controller);
        let outcome = controller.end(Point::new(122.0, 128.0));
        assert_eq!(outcome, Some(DragOutcome::Click(1)));
    }

    #[test]
    fn test_move_produces_override_for_dragged_node() {
        let mut controller = DragController::new();
        begin(&mut controller);

        let overlay = controller.pointer_move(Point::new(140.0, 150.0)).unwrap();

        assert_eq!(overlay.item, 1);
        assert_eq!(overlay.position, Point::new(120.0, 120.0));
        assert_eq!(controller.overlay(), Some(overlay));
    }

    #[test]
    fn test_non_primary_and_control_presses_do_not_start() {
        let mut controller = DragController::new();
        let mut try_begin =
            |button, target| controller.begin(1, Point::ZERO, Point::ZERO, button, target);
        assert!(!try_begin(MouseButton::Right, PointerTarget::Body));
        assert!(!try_begin(MouseButton::Middle, PointerTarget::Body));
        assert!(!try_begin(MouseButton::Left, PointerTarget::Control));
        assert!(!controller.is_active());
    }

    #[test]
    fn test_second_begin_is_refused_while_active() {
        let mut controller = DragController::new();
        begin(&mut controller);
        assert!(!controller.begin(
            2,
            Point::ZERO,
            Point::ZERO,
            MouseButton::Left,
            PointerTarget::Body
        ));
        assert_eq!(controller.session().map(|s| s.item), Some(1));
    }

    #[test]
    fn test_cancel_discards_session() {
        let mut controller = DragController::new();
        begin(&mut controller);
        controller.pointer_move(Point::new(200.0, 200.0));
        assert!(controller.cancel().is_some());
        assert_eq!(controller.end(Point::new(200.0, 200.0)), None);
    }

    #[test]
    fn test_move_without_session_is_ignored() {
        let mut controller = DragController::new();
        assert_eq!(controller.pointer_move(Point::new(1.0, 1.0)), None);
    }

    proptest! {
        #[test]
        fn prop_commit_only_beyond_threshold(
            sx in -500i32..500, sy in -500i32..500,
            ox in -500.0f64..500.0, oy in -500.0f64..500.0,
            dx in -10i32..=10, dy in -10i32..=10,
        ) {
            let (dx, dy) = (dx as f64, dy as f64);
            let mut controller = DragController::new();
            let start = Point::new(sx as f64, sy as f64);
            controller.begin(4, start, Point::new(ox, oy), MouseButton::Left, PointerTarget::Body);

            let outcome = controller.end(start + Vec2::new(dx, dy));

            if dx.abs().max(dy.abs()) <= DRAG_THRESHOLD {
                prop_assert_eq!(outcome, Some(DragOutcome::Click(4)));
            } else {
                match outcome {
                    Some(DragOutcome::Moved { item, position }) => {
                        prop_assert_eq!(item, 4);
                        prop_assert!((position.x - (ox + dx)).abs() < 1e-9);
                        prop_assert!((position.y - (oy + dy)).abs() < 1e-9);
                    }
                    other => prop_assert!(false, "expected commit, got {:?}", other),
                }
            }
        }
    }
}
