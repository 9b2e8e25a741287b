use chrono::NaiveDate;
use taskboard_core::{
    parse_task_records, BoardError, BoardSynchronizer, BucketKey, DropTarget, PatchFailurePolicy, PatchSettled,
    PatchTicket, PendingPatch, StoreError, SyncOptions, Task, TaskId, TaskStatus,
};

#[test]
fn confirmed_patch_applies_canonical_fields_in_place() {
    let mut sync = board(SyncOptions::default());
    let pending = drop_into(&mut sync, "a", BucketKey::Done, 0);

    let mut canonical = Task::new("a", "call lead (server)").with_status(TaskStatus::Completed);
    canonical.due_date = Some(date(2024, 6, 20));
    let settled = sync.complete_patch(pending.ticket, Ok(canonical)).unwrap();

    assert!(matches!(
        settled,
        PatchSettled::Confirmed {
            bucket: Some(BucketKey::Done),
            ..
        }
    ));
    let task = sync.board().task(&TaskId::from("a")).unwrap();
    assert_eq!(task.title, "call lead (server)");
    assert_eq!(task.due_date, Some(date(2024, 6, 20)));
    assert_eq!(sync.board().locate(&TaskId::from("a")), Some((BucketKey::Done, 0)));
    assert_eq!(sync.in_flight(), 0);
}

#[test]
fn canonical_record_in_other_bucket_moves_only_that_task() {
    let mut sync = board(SyncOptions::default());
    let pending = drop_into(&mut sync, "a", BucketKey::DueToday, 0);
    let untouched_upcoming = sync.board().bucket(BucketKey::Upcoming).to_vec();

    // Server kept the task pending but assigned its own date.
    let canonical = Task::new("a", "call lead").with_due_date(date(2024, 6, 30));
    let settled = sync.complete_patch(pending.ticket, Ok(canonical)).unwrap();

    assert!(matches!(
        settled,
        PatchSettled::Confirmed {
            bucket: Some(BucketKey::Upcoming),
            ..
        }
    ));
    assert!(sync.board().bucket(BucketKey::DueToday).len() == 1);
    let upcoming = sync.board().bucket(BucketKey::Upcoming);
    assert_eq!(&upcoming[..untouched_upcoming.len()], &untouched_upcoming[..]);
    assert_eq!(upcoming.last().unwrap().id, TaskId::from("a"));
}

#[test]
fn confirmed_done_move_keeps_task_with_unparsable_date_in_done() {
    let tasks = parse_task_records(
        r#"[{"id": 5, "title": "demo", "status": "pending", "due_date": "n/a"}]"#,
    )
    .unwrap();
    let mut sync = BoardSynchronizer::new(tasks, today(), SyncOptions::default());
    assert_eq!(
        sync.board().locate(&TaskId::from(5)),
        Some((BucketKey::Upcoming, 0))
    );

    let pending = drop_into(&mut sync, "5", BucketKey::Done, 0);
    assert_eq!(
        sync.board().locate(&TaskId::from(5)),
        Some((BucketKey::Done, 0))
    );

    let canonical = parse_task_records(
        r#"[{"id": 5, "title": "demo", "status": "completed", "due_date": "n/a"}]"#,
    )
    .unwrap()
    .remove(0);
    let settled = sync.complete_patch(pending.ticket, Ok(canonical)).unwrap();

    assert!(matches!(
        settled,
        PatchSettled::Confirmed {
            bucket: Some(BucketKey::Done),
            ..
        }
    ));
    assert_eq!(
        sync.board().locate(&TaskId::from(5)),
        Some((BucketKey::Done, 0))
    );
}

#[test]
fn response_for_one_task_during_another_drag_only_touches_that_task() {
    let mut sync = board(SyncOptions::default());
    let pending_a = drop_into(&mut sync, "a", BucketKey::Done, 0);

    sync.on_drag_start(&TaskId::from("b")).unwrap();
    let canonical = Task::new("a", "call lead").with_status(TaskStatus::Completed);
    sync.complete_patch(pending_a.ticket, Ok(canonical)).unwrap();

    assert!(sync.is_dragging());
    assert_eq!(
        sync.board().ids(BucketKey::Upcoming),
        vec![TaskId::from("b"), TaskId::from("c")]
    );

    let outcome = sync
        .on_drag_end(Some(DropTarget::new(BucketKey::Upcoming, 1)))
        .unwrap();
    assert!(outcome.pending_patch().is_none());
    assert_eq!(
        sync.board().ids(BucketKey::Upcoming),
        vec![TaskId::from("c"), TaskId::from("b")]
    );
    assert_eq!(
        sync.board().ids(BucketKey::Done),
        vec![TaskId::from("a"), TaskId::from("z")]
    );
}

#[test]
fn failure_keeps_optimistic_state_by_default() {
    let mut sync = board(SyncOptions::default());
    let pending = drop_into(&mut sync, "a", BucketKey::Done, 0);
    let after_drop = sync.board().clone();

    let settled = sync
        .complete_patch(
            pending.ticket,
            Err(StoreError::Transport("connection reset".to_string())),
        )
        .unwrap();

    match settled {
        PatchSettled::Failed {
            task_id,
            error,
            rolled_back,
        } => {
            assert_eq!(task_id, TaskId::from("a"));
            assert!(matches!(error, StoreError::Transport(_)));
            assert!(!rolled_back);
        }
        other => panic!("unexpected settle: {other:?}"),
    }
    assert_eq!(sync.board(), &after_drop);
    assert_eq!(sync.in_flight(), 0);
}

#[test]
fn failure_with_rollback_policy_restores_prior_position() {
    let options = SyncOptions {
        failure_policy: PatchFailurePolicy::Rollback,
        ..SyncOptions::default()
    };
    let mut sync = board(options);
    let before = sync.board().clone();
    let pending = drop_into(&mut sync, "b", BucketKey::Done, 1);

    let settled = sync
        .complete_patch(pending.ticket, Err(StoreError::Rejected("403".to_string())))
        .unwrap();

    assert!(matches!(
        settled,
        PatchSettled::Failed {
            rolled_back: true,
            ..
        }
    ));
    assert_eq!(sync.board(), &before);
}

#[test]
fn rollback_is_skipped_after_refresh() {
    let options = SyncOptions {
        failure_policy: PatchFailurePolicy::Rollback,
        ..SyncOptions::default()
    };
    let mut sync = board(options);
    let pending = drop_into(&mut sync, "a", BucketKey::Done, 0);

    let refreshed = vec![Task::new("a", "call lead").with_status(TaskStatus::Completed)];
    sync.refresh(refreshed, today()).unwrap();
    let after_refresh = sync.board().clone();

    let settled = sync
        .complete_patch(pending.ticket, Err(StoreError::Transport("timeout".to_string())))
        .unwrap();
    assert!(matches!(
        settled,
        PatchSettled::Failed {
            rolled_back: false,
            ..
        }
    ));
    assert_eq!(sync.board(), &after_refresh);
}

#[test]
fn older_ticket_for_same_task_is_superseded() {
    let mut sync = board(SyncOptions::default());
    let first = drop_into(&mut sync, "a", BucketKey::Done, 0);
    let second = drop_into(&mut sync, "a", BucketKey::DueToday, 0);

    let stale = Task::new("a", "call lead").with_status(TaskStatus::Completed);
    let settled = sync.complete_patch(first.ticket, Ok(stale)).unwrap();
    assert!(matches!(settled, PatchSettled::Superseded { .. }));
    assert_eq!(
        sync.board().locate(&TaskId::from("a")),
        Some((BucketKey::DueToday, 0))
    );

    let fresh = Task::new("a", "call lead").with_due_date(today());
    let settled = sync.complete_patch(second.ticket, Ok(fresh)).unwrap();
    assert!(matches!(settled, PatchSettled::Confirmed { .. }));
    assert_eq!(sync.in_flight(), 0);
}

#[test]
fn unknown_or_reused_ticket_is_an_error() {
    let mut sync = board(SyncOptions::default());
    let canonical = Task::new("a", "call lead");
    let error = sync
        .complete_patch(PatchTicket::new(99), Ok(canonical.clone()))
        .unwrap_err();
    assert_eq!(error, BoardError::UnknownTicket(PatchTicket::new(99)));

    let pending = drop_into(&mut sync, "a", BucketKey::Done, 0);
    let completed = canonical.with_status(TaskStatus::Completed);
    sync.complete_patch(pending.ticket, Ok(completed.clone()))
        .unwrap();
    let error = sync
        .complete_patch(pending.ticket, Ok(completed))
        .unwrap_err();
    assert_eq!(error, BoardError::UnknownTicket(pending.ticket));
}

#[test]
fn canonical_record_for_another_task_is_refused() {
    let mut sync = board(SyncOptions::default());
    let pending = drop_into(&mut sync, "a", BucketKey::Done, 0);

    let error = sync
        .complete_patch(pending.ticket, Ok(Task::new("b", "demo")))
        .unwrap_err();
    assert_eq!(
        error,
        BoardError::RecordMismatch {
            expected: TaskId::from("a"),
            actual: TaskId::from("b"),
        }
    );
    assert_eq!(sync.in_flight(), 1);
}

fn drop_into(
    sync: &mut BoardSynchronizer,
    id: &str,
    bucket: BucketKey,
    index: usize,
) -> PendingPatch {
    sync.on_drag_start(&TaskId::from(id)).unwrap();
    sync.on_drag_end(Some(DropTarget::new(bucket, index)))
        .unwrap()
        .pending_patch()
        .cloned()
        .expect("cross-bucket drop should issue a patch")
}

fn board(options: SyncOptions) -> BoardSynchronizer {
    let tasks = vec![
        Task::new("a", "call lead"),
        Task::new("b", "demo").with_due_date(date(2024, 7, 1)),
        Task::new("c", "renewal"),
        Task::new("t", "quote").with_due_date(today()),
        Task::new("z", "kickoff").with_status(TaskStatus::Completed),
    ];
    BoardSynchronizer::new(tasks, today(), options)
}

fn today() -> NaiveDate {
    date(2024, 6, 15)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
