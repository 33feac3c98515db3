#![forbid(unsafe_code)]

use std::sync::Arc;

use crate::board::collision::closest_corners;
use crate::board::partition::{StatusBuckets, partition};
use crate::board::{Bounds, DropZone, Point, TaskSnapshot};
use crate::task::model::{Task, TaskStatus};

/// Outbound port for status changes.
///
/// Implementations must not block: the controller calls this and immediately tears down the
/// drag session. Each drop produces at most one call and there is no retry.
pub trait StatusChangeRequester {
    fn request_status_change(&mut self, task_id: &str, new_status: TaskStatus);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragConfig {
    /// Pointer travel (cells) before a press becomes a drag. Shorter gestures are clicks.
    pub activation_distance: u16,
    /// Extra reach (cells) around each column when resolving the drop target.
    pub drop_margin: u16,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            activation_distance: 8,
            drop_margin: 0,
        }
    }
}

/// State of an in-progress drag. Lives only inside the controller.
#[derive(Debug, Clone)]
pub struct DragSession {
    task: Arc<Task>,
    origin: Point,
    pointer: Point,
    card: Bounds,
    hover: Option<String>,
}

impl DragSession {
    /// Read-only copy of the dragged task, for the overlay.
    #[must_use]
    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    #[must_use]
    pub fn hover(&self) -> Option<&str> {
        self.hover.as_deref()
    }

    #[must_use]
    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Where the floating card is drawn: the source card moved by the pointer's travel.
    #[must_use]
    pub fn overlay_bounds(&self) -> Bounds {
        self.card
            .translate(self.pointer.x - self.origin.x, self.pointer.y - self.origin.y)
    }
}

#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Pointer is down on a card but has not travelled far enough to count as a drag.
    Pressed {
        task: Arc<Task>,
        origin: Point,
        card: Bounds,
    },
    Dragging(DragSession),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Released outside every column, or over an unknown column identifier.
    NoTarget,
    /// Released over the column the task is already in. Nothing is requested.
    SameStatus,
    /// The dragged task is no longer in the current snapshot.
    StaleTask,
    Moved {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

#[derive(Debug, Clone)]
pub enum BoardEvent {
    /// Press and release without reaching the activation distance.
    TaskActivated(Arc<Task>),
    DragStarted(Arc<Task>),
    Dropped(DropOutcome),
    Cancelled,
}

/// Owns the status partition and the single active gesture.
///
/// A second press or drag start while a gesture is active is ignored; the first gesture
/// continues unaffected.
#[derive(Debug)]
pub struct BoardController<R> {
    requester: R,
    config: DragConfig,
    snapshot: TaskSnapshot,
    buckets: StatusBuckets,
    gesture: Gesture,
}

impl<R: StatusChangeRequester> BoardController<R> {
    pub fn new(requester: R, config: DragConfig) -> Self {
        Self {
            requester,
            config,
            snapshot: Arc::from(Vec::new()),
            buckets: StatusBuckets::default(),
            gesture: Gesture::Idle,
        }
    }

    /// Replaces the task collection. Repartitions only when `snapshot` is a different
    /// allocation from the current one; returns whether it did.
    pub fn set_tasks(&mut self, snapshot: TaskSnapshot) -> bool {
        if Arc::ptr_eq(&self.snapshot, &snapshot) {
            return false;
        }
        self.buckets = partition(&snapshot);
        self.snapshot = snapshot;
        tracing::trace!(tasks = self.snapshot.len(), "board repartitioned");
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> &TaskSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn buckets(&self) -> &StatusBuckets {
        &self.buckets
    }

    #[must_use]
    pub fn bucket(&self, status: TaskStatus) -> &[Arc<Task>] {
        self.buckets.get(status)
    }

    #[must_use]
    pub fn config(&self) -> DragConfig {
        self.config
    }

    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        match &self.gesture {
            Gesture::Dragging(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging(_))
    }

    #[must_use]
    pub fn requester(&self) -> &R {
        &self.requester
    }

    #[must_use]
    pub fn find(&self, task_id: &str) -> Option<&Arc<Task>> {
        self.snapshot.iter().find(|t| t.id == task_id)
    }

    /// Pointer pressed on a card. Returns false when ignored (unknown task or a gesture is
    /// already in progress).
    pub fn pointer_down(&mut self, task_id: &str, at: Point, card: Bounds) -> bool {
        if !matches!(self.gesture, Gesture::Idle) {
            tracing::debug!(task_id, "press ignored: gesture already active");
            return false;
        }
        let Some(task) = self.find(task_id).cloned() else {
            return false;
        };
        self.gesture = Gesture::Pressed {
            task,
            origin: at,
            card,
        };
        true
    }

    /// Pointer moved. Promotes a press to a drag once the activation distance is reached,
    /// and keeps the hover target of an active drag current.
    pub fn pointer_move(&mut self, at: Point, zones: &[DropZone]) -> Option<BoardEvent> {
        let mut started = None;
        if let Gesture::Pressed { task, origin, card } = &self.gesture
            && origin.reached(at, self.config.activation_distance)
        {
            let session = DragSession {
                task: Arc::clone(task),
                origin: *origin,
                pointer: *origin,
                card: *card,
                hover: None,
            };
            tracing::debug!(task_id = %task.id, "drag started");
            started = Some(BoardEvent::DragStarted(Arc::clone(task)));
            self.gesture = Gesture::Dragging(session);
        }

        let margin = self.config.drop_margin;
        if let Gesture::Dragging(session) = &mut self.gesture {
            session.pointer = at;
            let target = closest_corners(session.overlay_bounds(), zones, margin);
            session.hover = target.map(|z| z.id.clone());
        }
        started
    }

    /// Pointer released. A press that never became a drag activates the task; a drag is
    /// dropped on whatever column the release position resolves to.
    ///
    /// A press whose first qualifying movement is the release itself is dropped directly: the
    /// result is `Dropped` and no `DragStarted` is reported for it.
    pub fn pointer_up(&mut self, at: Point, zones: &[DropZone]) -> Option<BoardEvent> {
        let _started = self.pointer_move(at, zones);
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Pressed { task, .. } => {
                tracing::debug!(task_id = %task.id, "task activated");
                Some(BoardEvent::TaskActivated(task))
            }
            Gesture::Dragging(session) => {
                let target = session.hover.clone();
                self.gesture = Gesture::Dragging(session);
                Some(BoardEvent::Dropped(self.drag_end(target.as_deref())))
            }
        }
    }

    /// Starts a drag directly, bypassing the activation distance (keyboard pick-up).
    pub fn drag_start(&mut self, task_id: &str, at: Point, card: Bounds) -> bool {
        if !matches!(self.gesture, Gesture::Idle) {
            tracing::debug!(task_id, "drag start ignored: gesture already active");
            return false;
        }
        let Some(task) = self.find(task_id).cloned() else {
            return false;
        };
        tracing::debug!(task_id, "drag started");
        self.gesture = Gesture::Dragging(DragSession {
            task,
            origin: at,
            pointer: at,
            card,
            hover: None,
        });
        true
    }

    /// Sets the hover target of the active drag. Never touches the partition.
    pub fn drag_over(&mut self, target: Option<&str>) {
        if let Gesture::Dragging(session) = &mut self.gesture {
            session.hover = target.map(str::to_owned);
        }
    }

    /// Ends the active drag over `target` and discards the session.
    ///
    /// A different, known column results in exactly one status-change request; the session
    /// is gone before that request completes.
    pub fn drag_end(&mut self, target: Option<&str>) -> DropOutcome {
        let Gesture::Dragging(session) = std::mem::take(&mut self.gesture) else {
            return DropOutcome::NoTarget;
        };
        let task_id = session.task.id.as_str();

        let Some(to) = target.and_then(TaskStatus::from_column_id) else {
            tracing::debug!(task_id, ?target, "drop ignored: no valid target");
            return DropOutcome::NoTarget;
        };
        let Some(current) = self.find(task_id) else {
            tracing::debug!(task_id, "drop ignored: task no longer on the board");
            return DropOutcome::StaleTask;
        };
        let from = current.status;
        if from == to {
            return DropOutcome::SameStatus;
        }

        tracing::info!(task_id, from = %from, to = %to, "requesting status change");
        self.requester.request_status_change(task_id, to);
        DropOutcome::Moved {
            task_id: task_id.to_owned(),
            from,
            to,
        }
    }

    /// Drops the active drag on its current hover target.
    pub fn drag_end_hovered(&mut self) -> DropOutcome {
        let target = self.session().and_then(|s| s.hover.clone());
        self.drag_end(target.as_deref())
    }

    /// Discards any gesture without side effects.
    pub fn drag_cancel(&mut self) -> Option<BoardEvent> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Pressed { .. } => Some(BoardEvent::Cancelled),
            Gesture::Dragging(session) => {
                tracing::debug!(task_id = %session.task.id, "drag cancelled");
                Some(BoardEvent::Cancelled)
            }
        }
    }
}
