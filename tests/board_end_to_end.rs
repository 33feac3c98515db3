use std::time::Duration;

use taskboard::board::{
    BoardController, BoardEvent, Bounds, DragConfig, DropOutcome, DropZone, Point,
    StatusChangeResult, StatusDispatcher, snapshot_from, spawn_status_worker, with_status,
};
use taskboard::task::model::{Task, TaskPriority, TaskStatus};
use taskboard::task::storage::TaskStorage;
use tokio::sync::mpsc;

fn columns() -> Vec<DropZone> {
    vec![
        DropZone::new("TODO", Bounds::new(0, 0, 30, 20)),
        DropZone::new("IN_PROGRESS", Bounds::new(30, 0, 30, 20)),
        DropZone::new("COMPLETED", Bounds::new(60, 0, 30, 20)),
    ]
}

fn seed(storage: &TaskStorage) {
    for (id, status) in [
        ("t1", TaskStatus::Todo),
        ("t2", TaskStatus::Todo),
        ("t3", TaskStatus::Completed),
    ] {
        let mut t = Task::new(format!("task {id}"), status, TaskPriority::Medium);
        t.id = id.to_owned();
        storage.save(&t).expect("save");
    }
}

async fn next_result(
    results: &mut mpsc::UnboundedReceiver<StatusChangeResult>,
) -> StatusChangeResult {
    tokio::time::timeout(Duration::from_secs(5), results.recv())
        .await
        .expect("result in time")
        .expect("worker alive")
}

#[tokio::test]
async fn mouse_drag_persists_status_change() {
    let td = tempfile::tempdir().expect("tempdir");
    let storage = TaskStorage::new(td.path().join("tasks"));
    seed(&storage);

    let (dispatcher, requests) = StatusDispatcher::channel();
    let (results_tx, mut results) = mpsc::unbounded_channel();
    let worker = spawn_status_worker(storage.clone(), requests, results_tx);

    let mut board = BoardController::new(dispatcher, DragConfig::default());
    board.set_tasks(snapshot_from(storage.list().expect("list")));
    assert_eq!(board.bucket(TaskStatus::Todo).len(), 2);

    let zones = columns();
    assert!(board.pointer_down("t1", Point::new(5, 2), Bounds::new(1, 1, 28, 4)));
    // Below the activation distance nothing happens yet.
    assert!(board.pointer_move(Point::new(8, 2), &zones).is_none());
    assert!(!board.is_dragging());

    let started = board.pointer_move(Point::new(40, 3), &zones);
    assert!(matches!(started, Some(BoardEvent::DragStarted(t)) if t.id == "t1"));
    assert_eq!(board.session().and_then(|s| s.hover()), Some("IN_PROGRESS"));

    let Some(BoardEvent::Dropped(outcome)) = board.pointer_up(Point::new(40, 3), &zones) else {
        panic!("expected a drop");
    };
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            task_id: "t1".to_owned(),
            from: TaskStatus::Todo,
            to: TaskStatus::InProgress,
        }
    );
    assert!(board.session().is_none());

    // Optimistic patch before the store confirms.
    let patched = with_status(board.snapshot(), "t1", TaskStatus::InProgress);
    assert!(board.set_tasks(patched));
    assert_eq!(board.bucket(TaskStatus::InProgress)[0].id, "t1");

    let result = next_result(&mut results).await;
    assert_eq!(result.change.task_id, "t1");
    let saved = result.outcome.expect("status change applied");
    assert_eq!(saved.status, TaskStatus::InProgress);

    // Re-fetch agrees with the optimistic view.
    board.set_tasks(snapshot_from(storage.list().expect("list")));
    assert_eq!(board.bucket(TaskStatus::Todo).len(), 1);
    assert_eq!(board.bucket(TaskStatus::InProgress)[0].id, "t1");
    assert_eq!(board.bucket(TaskStatus::Completed).len(), 1);

    drop(board);
    worker.await.expect("worker exits");
}

#[tokio::test]
async fn failed_change_reverts_on_refetch() {
    let td = tempfile::tempdir().expect("tempdir");
    let storage = TaskStorage::new(td.path().join("tasks"));
    seed(&storage);

    let (dispatcher, requests) = StatusDispatcher::channel();
    let (results_tx, mut results) = mpsc::unbounded_channel();
    let worker = spawn_status_worker(storage.clone(), requests, results_tx);

    let mut board = BoardController::new(dispatcher, DragConfig::default());
    board.set_tasks(snapshot_from(storage.list().expect("list")));

    // Keyboard pick-up: no activation distance.
    assert!(board.drag_start("t2", Point::new(1, 5), Bounds::new(1, 5, 28, 4)));
    board.drag_over(Some("COMPLETED"));

    // Someone else deletes the task while it is being carried.
    storage.delete("t2").expect("delete");

    let outcome = board.drag_end_hovered();
    assert!(matches!(outcome, DropOutcome::Moved { ref task_id, .. } if task_id == "t2"));
    board.set_tasks(with_status(board.snapshot(), "t2", TaskStatus::Completed));
    assert_eq!(board.bucket(TaskStatus::Completed).len(), 2);

    let result = next_result(&mut results).await;
    assert!(result.outcome.is_err());

    board.set_tasks(snapshot_from(storage.list().expect("list")));
    assert!(board.find("t2").is_none());
    assert_eq!(board.bucket(TaskStatus::Completed).len(), 1);

    drop(board);
    worker.await.expect("worker exits");
}

#[tokio::test]
async fn drop_on_own_column_sends_nothing() {
    let td = tempfile::tempdir().expect("tempdir");
    let storage = TaskStorage::new(td.path().join("tasks"));
    seed(&storage);

    let (dispatcher, requests) = StatusDispatcher::channel();
    let (results_tx, mut results) = mpsc::unbounded_channel();
    let worker = spawn_status_worker(storage.clone(), requests, results_tx);

    let mut board = BoardController::new(dispatcher, DragConfig::default());
    board.set_tasks(snapshot_from(storage.list().expect("list")));

    assert!(board.drag_start("t3", Point::new(61, 1), Bounds::new(61, 1, 28, 4)));
    board.drag_over(Some("COMPLETED"));
    assert_eq!(board.drag_end_hovered(), DropOutcome::SameStatus);

    drop(board);
    worker.await.expect("worker exits");
    assert!(results.recv().await.is_none());
}
