#![forbid(unsafe_code)]

//! Kanban board core: partitions a task snapshot into status columns and turns pointer
//! gestures into status-change requests.
//!
//! The board never owns tasks. Callers supply a [`TaskSnapshot`] wholesale; the controller
//! repartitions when the snapshot pointer changes and otherwise treats it as immutable.

pub mod collision;
pub mod controller;
pub mod dispatch;
pub mod partition;

use std::sync::Arc;

use crate::task::model::Task;

pub use collision::closest_corners;
pub use controller::{
    BoardController, BoardEvent, DragConfig, DragSession, DropOutcome, Gesture,
    StatusChangeRequester,
};
pub use dispatch::{StatusChange, StatusChangeResult, StatusDispatcher, spawn_status_worker};
pub use partition::{StatusBuckets, partition, with_status};

/// Immutable task collection as seen by one render pass.
pub type TaskSnapshot = Arc<[Arc<Task>]>;

#[must_use]
pub fn snapshot_from(tasks: Vec<Task>) -> TaskSnapshot {
    tasks.into_iter().map(Arc::new).collect()
}

/// A position in cell units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True when `other` is at least `threshold` cells away (Euclidean).
    #[must_use]
    pub fn reached(self, other: Point, threshold: u16) -> bool {
        let dx = i64::from(other.x - self.x);
        let dy = i64::from(other.y - self.y);
        let t = i64::from(threshold);
        dx * dx + dy * dy >= t * t
    }
}

/// An axis-aligned rectangle in cell units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(self) -> i32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(self) -> i32 {
        self.y + self.height
    }

    #[must_use]
    pub fn contains(self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    #[must_use]
    pub fn intersects(self, other: Bounds) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    #[must_use]
    pub fn expand(self, margin: u16) -> Bounds {
        let m = i32::from(margin);
        Bounds::new(self.x - m, self.y - m, self.width + 2 * m, self.height + 2 * m)
    }

    #[must_use]
    pub fn translate(self, dx: i32, dy: i32) -> Bounds {
        Bounds::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

impl From<ratatui::layout::Rect> for Bounds {
    fn from(r: ratatui::layout::Rect) -> Self {
        Bounds::new(
            i32::from(r.x),
            i32::from(r.y),
            i32::from(r.width),
            i32::from(r.height),
        )
    }
}

/// A candidate drop target: a column identifier and where it is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropZone {
    pub id: String,
    pub bounds: Bounds,
}

impl DropZone {
    #[must_use]
    pub fn new(id: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            bounds,
        }
    }
}
