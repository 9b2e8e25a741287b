use chrono::NaiveDate;
use taskboard_core::{
    BoardError, BoardSynchronizer, BucketKey, DragState, DropOutcome, DropRejection, DropTarget,
    PatchTicket, RecordDefect, SyncOptions, Task, TaskId, TaskPatch, TaskStatus,
    UpcomingDatePolicy,
};

#[test]
fn drop_outside_board_leaves_state_untouched() {
    let mut sync = sample_board(SyncOptions::default());
    let before = sync.board().clone();

    sync.on_drag_start(&TaskId::from("u1")).unwrap();
    sync.on_drag_over(Some(BucketKey::Done)).unwrap();
    let outcome = sync.on_drag_end(None).unwrap();

    assert_eq!(outcome, DropOutcome::Cancelled);
    assert_eq!(sync.board(), &before);
    assert_eq!(sync.in_flight(), 0);
    assert_eq!(sync.drag_state(), &DragState::Idle);
}

#[test]
fn explicit_cancel_behaves_like_drop_outside() {
    let mut sync = sample_board(SyncOptions::default());
    let before = sync.board().clone();

    sync.on_drag_start(&TaskId::from("t1")).unwrap();
    assert_eq!(sync.on_drag_cancel().unwrap(), DropOutcome::Cancelled);
    assert_eq!(sync.board(), &before);
    assert_eq!(sync.in_flight(), 0);
}

#[test]
fn cross_bucket_move_to_done_emits_single_completed_patch() {
    let mut sync = sample_board(SyncOptions::default());

    sync.on_drag_start(&TaskId::from("u1")).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Done, 0)))
        .unwrap();

    let DropOutcome::Moved {
        from,
        to,
        index,
        patch,
    } = outcome
    else {
        panic!("expected a cross-bucket move");
    };
    assert_eq!(from, BucketKey::Upcoming);
    assert_eq!(to, BucketKey::Done);
    assert_eq!(index, 0);
    assert_eq!(patch.task_id, TaskId::from("u1"));
    assert_eq!(
        patch.patch,
        TaskPatch {
            status: Some(TaskStatus::Completed),
            due_date: None,
        }
    );
    assert_eq!(sync.in_flight(), 1);

    let done = sync.board().ids(BucketKey::Done);
    assert_eq!(done, vec![TaskId::from("u1"), TaskId::from("d1")]);
    assert!(!sync
        .board()
        .ids(BucketKey::Upcoming)
        .contains(&TaskId::from("u1")));
    assert_eq!(
        sync.board().task(&TaskId::from("u1")).unwrap().status,
        TaskStatus::Completed
    );
}

#[test]
fn move_to_due_today_sets_pending_and_today() {
    let mut sync = sample_board(SyncOptions::default());

    sync.on_drag_start(&TaskId::from("d1")).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::DueToday, 5)))
        .unwrap();

    let patch = outcome.pending_patch().expect("cross move should patch");
    assert_eq!(
        patch.patch,
        TaskPatch {
            status: Some(TaskStatus::Pending),
            due_date: Some(today()),
        }
    );
    assert_eq!(
        sync.board().ids(BucketKey::DueToday),
        vec![TaskId::from("t1"), TaskId::from("d1")]
    );
}

#[test]
fn move_to_upcoming_uses_configured_date_policy() {
    let later = date(2024, 8, 1);
    let tasks = vec![Task::new("x", "scheduled")
        .with_status(TaskStatus::Completed)
        .with_due_date(later)];

    let mut tomorrow_board = BoardSynchronizer::new(tasks.clone(), today(), SyncOptions::default());
    tomorrow_board.on_drag_start(&TaskId::from("x")).unwrap();
    let outcome = tomorrow_board
        .on_drag_end(Some(DropTarget::new(BucketKey::Upcoming, 0)))
        .unwrap();
    assert_eq!(
        outcome.pending_patch().unwrap().patch.due_date,
        Some(date(2024, 6, 16))
    );

    let keep_options = SyncOptions {
        upcoming_policy: UpcomingDatePolicy::KeepFuture,
        ..SyncOptions::default()
    };
    let mut keep_board = BoardSynchronizer::new(tasks, today(), keep_options);
    keep_board.on_drag_start(&TaskId::from("x")).unwrap();
    let outcome = keep_board
        .on_drag_end(Some(DropTarget::new(BucketKey::Upcoming, 0)))
        .unwrap();
    assert_eq!(outcome.pending_patch().unwrap().patch.due_date, Some(later));
}

#[test]
fn same_bucket_reorder_emits_no_patch() {
    let mut sync = sample_board(SyncOptions::default());
    let before = sync.board().clone();

    sync.on_drag_start(&TaskId::from("u1")).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Upcoming, 2)))
        .unwrap();

    assert_eq!(
        outcome,
        DropOutcome::Reordered {
            bucket: BucketKey::Upcoming,
            from: 0,
            to: 2,
        }
    );
    assert_eq!(sync.in_flight(), 0);
    assert_eq!(
        sync.board().ids(BucketKey::Upcoming),
        vec![TaskId::from("u2"), TaskId::from("u3"), TaskId::from("u1")]
    );
    for key in [BucketKey::Overdue, BucketKey::DueToday, BucketKey::Done] {
        assert_eq!(sync.board().bucket(key), before.bucket(key));
    }
    assert_eq!(
        sync.board().task(&TaskId::from("u1")),
        before.task(&TaskId::from("u1"))
    );
}

#[test]
fn reorder_index_is_clamped_to_bucket_end() {
    let mut sync = sample_board(SyncOptions::default());

    sync.on_drag_start(&TaskId::from("u2")).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Upcoming, 40)))
        .unwrap();

    assert_eq!(
        outcome,
        DropOutcome::Reordered {
            bucket: BucketKey::Upcoming,
            from: 1,
            to: 2,
        }
    );
}

#[test]
fn overdue_target_is_rejected_without_changes() {
    let mut sync = sample_board(SyncOptions::default());
    let before = sync.board().clone();

    sync.on_drag_start(&TaskId::from("t1")).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Overdue, 0)))
        .unwrap();

    assert_eq!(
        outcome,
        DropOutcome::Rejected {
            reason: DropRejection::OverdueTarget,
        }
    );
    assert_eq!(sync.board(), &before);
    assert_eq!(sync.in_flight(), 0);
}

#[test]
fn reorder_within_overdue_is_allowed() {
    let tasks = vec![
        Task::new("o1", "a").with_due_date(date(2024, 6, 1)),
        Task::new("o2", "b").with_due_date(date(2024, 6, 2)),
    ];
    let mut sync = BoardSynchronizer::new(tasks, today(), SyncOptions::default());

    sync.on_drag_start(&TaskId::from("o2")).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Overdue, 0)))
        .unwrap();

    assert!(matches!(outcome, DropOutcome::Reordered { .. }));
    assert_eq!(
        sync.board().ids(BucketKey::Overdue),
        vec![TaskId::from("o2"), TaskId::from("o1")]
    );
}

#[test]
fn task_without_store_id_cannot_change_bucket() {
    let mut orphan = Task::new(TaskId::local_placeholder(), "orphan");
    orphan.defects.push(RecordDefect::MissingId);
    let orphan_id = orphan.id.clone();
    let mut sync = BoardSynchronizer::new(vec![orphan], today(), SyncOptions::default());
    let before = sync.board().clone();

    sync.on_drag_start(&orphan_id).unwrap();
    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Done, 0)))
        .unwrap();

    assert_eq!(
        outcome,
        DropOutcome::Rejected {
            reason: DropRejection::MissingStoreId,
        }
    );
    assert_eq!(sync.board(), &before);
}

#[test]
fn drag_lifecycle_misuse_is_reported() {
    let mut sync = sample_board(SyncOptions::default());

    assert_eq!(sync.on_drag_end(None), Err(BoardError::NotDragging));
    assert_eq!(
        sync.on_drag_over(Some(BucketKey::Done)),
        Err(BoardError::NotDragging)
    );
    assert_eq!(
        sync.on_drag_start(&TaskId::from("missing")),
        Err(BoardError::TaskNotFound(TaskId::from("missing")))
    );

    sync.on_drag_start(&TaskId::from("u1")).unwrap();
    assert_eq!(
        sync.on_drag_start(&TaskId::from("u2")),
        Err(BoardError::AlreadyDragging(TaskId::from("u1")))
    );
    assert_eq!(
        sync.refresh(Vec::new(), today()),
        Err(BoardError::DragInProgress)
    );
    assert_eq!(sync.board().len(), 6);
}

#[test]
fn drag_start_records_source_and_hover() {
    let mut sync = sample_board(SyncOptions::default());

    let session = sync.on_drag_start(&TaskId::from("u3")).unwrap();
    assert_eq!(session.source, BucketKey::Upcoming);
    assert_eq!(session.source_index, 2);

    sync.on_drag_over(Some(BucketKey::Done)).unwrap();
    let snapshot = sync.snapshot();
    let dragging = snapshot.dragging.expect("drag should be visible in snapshot");
    assert_eq!(dragging.hover, Some(BucketKey::Done));
    assert_eq!(snapshot.buckets.len(), 4);
    assert_eq!(snapshot.buckets[2].count, 3);
}

#[test]
fn tickets_increase_per_cross_move() {
    let mut sync = sample_board(SyncOptions::default());

    sync.on_drag_start(&TaskId::from("u1")).unwrap();
    let first = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Done, 0)))
        .unwrap();
    sync.on_drag_start(&TaskId::from("u2")).unwrap();
    let second = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::DueToday, 0)))
        .unwrap();

    assert_eq!(first.pending_patch().unwrap().ticket, PatchTicket::new(1));
    assert_eq!(second.pending_patch().unwrap().ticket, PatchTicket::new(2));
    assert_eq!(sync.in_flight(), 2);
}

fn sample_board(options: SyncOptions) -> BoardSynchronizer {
    let tasks = vec![
        Task::new("u1", "call lead"),
        Task::new("t1", "send quote").with_due_date(today()),
        Task::new("u2", "demo").with_due_date(date(2024, 7, 1)),
        Task::new("d1", "kickoff").with_status(TaskStatus::Completed),
        Task::new("u3", "renewal"),
        Task::new("o1", "invoice").with_due_date(date(2024, 6, 10)),
    ];
    BoardSynchronizer::new(tasks, today(), options)
}

fn today() -> NaiveDate {
    date(2024, 6, 15)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
