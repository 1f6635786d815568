use planboard_core::delta::{PositionOutcome, PositionUpdate, SyncDelta, TaskUpdate};
use planboard_core::CoreError;
use planboard_engine::EngineError;
use planboard_harness::{dt, operation, TestPlanner};
use planboard_store::Store;

// ============================================================================
// Atomic delta application
// ============================================================================

#[test]
fn created_task_round_trips_with_computed_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let task = operation("mill housing", "2026-03-02 09:00", 45);
    let task_id = task.task_id;

    let ack = planner.engine.apply_sync(&SyncDelta {
        created_tasks: vec![task],
        ..SyncDelta::default()
    })?;

    assert_eq!(ack.planned_end(task_id), Some(dt("2026-03-02 09:45")));
    let stored = planner.task(task_id)?;
    assert_eq!(stored.planned_start, dt("2026-03-02 09:00"));
    assert_eq!(stored.duration_minutes, 45);
    Ok(())
}

#[test]
fn update_changes_editable_fields_only() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let order_id = planner.order("PO-1", "2026-03-31")?;
    let task_id = planner.add_task_for_order("weld frame", "2026-03-02 09:00", 60, order_id)?;

    let mut update = TaskUpdate::from_task(&planner.task(task_id)?);
    update.title = "weld frame rev B".into();
    update.planned_start = dt("2026-03-02 13:00");
    let ack = planner.engine.apply_sync(&SyncDelta {
        updated_tasks: vec![update],
        ..SyncDelta::default()
    })?;

    assert_eq!(ack.planned_end(task_id), Some(dt("2026-03-02 14:00")));
    let stored = planner.task(task_id)?;
    assert_eq!(stored.title, "weld frame rev B");
    // ERP linkage survives every update.
    assert_eq!(stored.order_id, Some(order_id));
    Ok(())
}

#[test]
fn one_bad_change_rejects_the_whole_batch() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let good = operation("good", "2026-03-02 09:00", 45);
    let good_id = good.task_id;
    // 20 minutes is off the 15-minute grid.
    let bad = operation("bad", "2026-03-02 10:00", 20);

    let result = planner.engine.apply_sync(&SyncDelta {
        created_tasks: vec![good, bad],
        ..SyncDelta::default()
    });

    assert!(matches!(
        result,
        Err(EngineError::Core(CoreError::InvalidDuration { minutes: 20 }))
    ));
    assert!(planner.engine.store().get_task(good_id)?.is_none());
    Ok(())
}

#[test]
fn assignment_to_inactive_resource_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    planner.engine.store_mut().set_resource_active(saw, false)?;

    let mut task = operation("cut stock", "2026-03-02 09:00", 30);
    task.resource_id = Some(saw);
    let result = planner.engine.apply_sync(&SyncDelta {
        created_tasks: vec![task],
        ..SyncDelta::default()
    });

    assert!(matches!(result, Err(EngineError::ResourceInactive(_))));
    Ok(())
}

#[test]
fn duplicate_create_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let task = operation("drill", "2026-03-02 09:00", 30);
    planner.engine.apply_sync(&SyncDelta {
        created_tasks: vec![task.clone()],
        ..SyncDelta::default()
    })?;

    let result = planner.engine.apply_sync(&SyncDelta {
        created_tasks: vec![task],
        ..SyncDelta::default()
    });
    assert!(matches!(result, Err(EngineError::TaskAlreadyExists(_))));
    Ok(())
}

#[test]
fn link_closing_a_cycle_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let a = planner.add_task("a", "2026-03-02 09:00", 60)?;
    let b = planner.add_task("b", "2026-03-02 10:00", 60)?;
    let c = planner.add_task("c", "2026-03-02 11:00", 60)?;
    planner.link(a, b)?;
    planner.link(b, c)?;

    let back_edge = planboard_core::link::DependencyLink::finish_to_start(c, a);
    let result = planner.engine.apply_sync(&SyncDelta {
        created_links: vec![back_edge],
        ..SyncDelta::default()
    });

    assert!(matches!(result, Err(EngineError::CycleDetected(_))));
    assert_eq!(planner.engine.store().all_links()?.len(), 2);
    Ok(())
}

#[test]
fn deleting_a_task_cascades_its_links() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let a = planner.add_task("a", "2026-03-02 09:00", 60)?;
    let b = planner.add_task("b", "2026-03-02 10:00", 60)?;
    let c = planner.add_task("c", "2026-03-02 11:00", 60)?;
    planner.link(a, b)?;
    planner.link(b, c)?;

    planner.engine.apply_sync(&SyncDelta {
        deleted_task_ids: vec![b],
        ..SyncDelta::default()
    })?;

    assert!(planner.engine.store().get_task(b)?.is_none());
    assert!(planner.engine.store().all_links()?.is_empty());
    Ok(())
}

#[test]
fn empty_delta_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let ack = planner.engine.apply_sync(&SyncDelta::default())?;
    assert!(ack.acks.is_empty());
    Ok(())
}

#[test]
fn schedule_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("planboard.sqlite");
    let path = path.to_str().ok_or("non-utf8 temp path")?;

    let task_id = {
        let mut planner = TestPlanner::open(path)?;
        let a = planner.add_task("a", "2026-03-02 09:00", 60)?;
        let b = planner.add_task("b", "2026-03-02 10:00", 60)?;
        planner.link(a, b)?;
        a
    };

    let planner = TestPlanner::open(path)?;
    assert_eq!(planner.task(task_id)?.title, "a");
    assert_eq!(planner.engine.store().all_links()?.len(), 1);
    Ok(())
}

// ============================================================================
// Batch position updates
// ============================================================================

#[test]
fn positions_apply_per_item() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let a = planner.add_task("a", "2026-03-02 09:00", 60)?;
    let b = planner.add_task("b", "2026-03-02 11:00", 60)?;

    let outcomes = planner.engine.update_positions(&[
        PositionUpdate {
            task_id: a,
            planned_start: dt("2026-03-02 10:00"),
            duration_minutes: 90,
            progress: 50,
        },
        // Off-grid duration: rejected without touching the task.
        PositionUpdate {
            task_id: b,
            planned_start: dt("2026-03-02 12:00"),
            duration_minutes: 10,
            progress: 0,
        },
    ])?;

    assert!(matches!(
        outcomes[0],
        PositionOutcome::Applied { task_id, planned_end }
            if task_id == a && planned_end == dt("2026-03-02 11:30")
    ));
    assert!(matches!(outcomes[1], PositionOutcome::Rejected { task_id, .. } if task_id == b));

    assert_eq!(planner.task(a)?.progress, 50);
    assert_eq!(planner.task(b)?.planned_start, dt("2026-03-02 11:00"));
    Ok(())
}

#[test]
fn position_for_unknown_task_is_rejected_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let a = planner.add_task("a", "2026-03-02 09:00", 60)?;

    let outcomes = planner.engine.update_positions(&[
        PositionUpdate {
            task_id: planboard_core::ids::TaskId::new(),
            planned_start: dt("2026-03-02 10:00"),
            duration_minutes: 60,
            progress: 0,
        },
        PositionUpdate {
            task_id: a,
            planned_start: dt("2026-03-02 14:00"),
            duration_minutes: 60,
            progress: 0,
        },
    ])?;

    assert!(matches!(outcomes[0], PositionOutcome::Rejected { .. }));
    assert!(matches!(outcomes[1], PositionOutcome::Applied { .. }));
    assert_eq!(planner.task(a)?.planned_start, dt("2026-03-02 14:00"));
    Ok(())
}
