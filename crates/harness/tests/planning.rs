use chrono::{NaiveTime, Weekday};
use planboard_core::calendar::{WeekCalendar, WorkingHours};
use planboard_core::conflict::ConflictKind;
use planboard_core::resource::{ResourceKind, ResourceMaster};
use planboard_engine::{EngineError, ResourceFilter, ShiftRequest};
use planboard_harness::{dt, TestPlanner};
use planboard_store::Store;

// ============================================================================
// Bulk department shift
// ============================================================================

#[test]
fn shift_translates_the_whole_department() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let dept = planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    let a = planner.add_task_on("cut a", "2026-03-02 09:00", 60, saw)?;
    let b = planner.add_task_on("cut b", "2026-03-02 11:00", 45, saw)?;

    let moved = planner.engine.shift_schedule(&ShiftRequest {
        department_id: Some(dept),
        offset_minutes: 120,
        date_from: None,
    })?;

    assert_eq!(moved, 2);
    assert_eq!(planner.task(a)?.planned_start, dt("2026-03-02 11:00"));
    assert_eq!(planner.task(b)?.planned_start, dt("2026-03-02 13:00"));
    // Durations and spacing are untouched.
    assert_eq!(planner.task(b)?.duration_minutes, 45);
    Ok(())
}

#[test]
fn shift_from_a_date_leaves_earlier_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let dept = planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    let early = planner.add_task_on("early", "2026-03-02 09:00", 60, saw)?;
    let late = planner.add_task_on("late", "2026-03-03 09:00", 60, saw)?;

    let moved = planner.engine.shift_schedule(&ShiftRequest {
        department_id: Some(dept),
        offset_minutes: 60,
        date_from: Some(dt("2026-03-03 00:00")),
    })?;

    assert_eq!(moved, 1);
    assert_eq!(planner.task(early)?.planned_start, dt("2026-03-02 09:00"));
    assert_eq!(planner.task(late)?.planned_start, dt("2026-03-03 10:00"));
    Ok(())
}

#[test]
fn negative_offset_moves_earlier() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let dept = planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    let a = planner.add_task_on("cut", "2026-03-02 11:00", 60, saw)?;

    planner.engine.shift_schedule(&ShiftRequest {
        department_id: Some(dept),
        offset_minutes: -90,
        date_from: None,
    })?;

    assert_eq!(planner.task(a)?.planned_start, dt("2026-03-02 09:30"));
    Ok(())
}

#[test]
fn other_departments_are_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let machining = planner.department("Machining", "D-100")?;
    planner.department("Assembly", "D-200")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    let press = planner.machine("press", "D-200", &["production"])?;
    planner.add_task_on("cut", "2026-03-02 09:00", 60, saw)?;
    let assemble = planner.add_task_on("assemble", "2026-03-02 09:00", 60, press)?;

    let moved = planner.engine.shift_schedule(&ShiftRequest {
        department_id: Some(machining),
        offset_minutes: 60,
        date_from: None,
    })?;

    assert_eq!(moved, 1);
    assert_eq!(planner.task(assemble)?.planned_start, dt("2026-03-02 09:00"));
    Ok(())
}

#[test]
fn no_department_filter_shifts_everything() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    let assigned = planner.add_task_on("cut", "2026-03-02 09:00", 60, saw)?;
    let unassigned = planner.add_task("paperwork", "2026-03-02 09:00", 60)?;

    let moved = planner.engine.shift_schedule(&ShiftRequest {
        department_id: None,
        offset_minutes: 60,
        date_from: None,
    })?;

    assert_eq!(moved, 2);
    assert_eq!(planner.task(assigned)?.planned_start, dt("2026-03-02 10:00"));
    assert_eq!(planner.task(unassigned)?.planned_start, dt("2026-03-02 10:00"));
    Ok(())
}

#[test]
fn shifting_a_machine_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;

    let result = planner.engine.shift_schedule(&ShiftRequest {
        department_id: Some(saw),
        offset_minutes: 60,
        date_from: None,
    });
    assert!(matches!(result, Err(EngineError::NotADepartment(_))));
    Ok(())
}

// ============================================================================
// Resource registry
// ============================================================================

#[test]
fn visible_resources_respect_both_filter_axes() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    planner.department("Machining", "D-100")?;
    planner.department("Assembly", "D-200")?;
    planner.machine("saw", "D-100", &["production"])?;
    planner.machine("press", "D-200", &["production"])?;

    let visible = planner.engine.visible_resources(&ResourceFilter {
        department_erp_ids: Some(vec!["D-100".into()]),
        max_level: Some(1),
    })?;

    let names: Vec<&str> = visible.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"Machining"));
    assert!(names.contains(&"saw"));
    assert!(!names.contains(&"press"));
    assert!(!names.contains(&"Assembly"));
    Ok(())
}

#[test]
fn master_sync_creates_updates_and_deactivates() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    planner.machine("old press", "D-100", &["production"])?;

    let master = vec![
        ResourceMaster {
            kind: ResourceKind::Machine,
            name: "saw mk2".into(),
            erp_id: "M-saw".into(),
            erp_department_id: Some("D-100".into()),
            level: 2,
            capabilities: vec!["production".into(), "cutting".into()],
        },
        ResourceMaster {
            kind: ResourceKind::Employee,
            name: "J. Miller".into(),
            erp_id: "E-17".into(),
            erp_department_id: Some("D-100".into()),
            level: 1,
            capabilities: vec!["production".into()],
        },
    ];
    let report = planner.engine.sync_resources(&master)?;

    assert_eq!(report.created, 1);
    assert_eq!(report.updated, 1);
    // The department and the old press are absent from the pull.
    assert_eq!(report.deactivated, 2);

    // The matched machine keeps its id, so assignments survive.
    let updated = planner
        .engine
        .store()
        .get_resource(saw)?
        .ok_or("saw vanished")?;
    assert_eq!(updated.name, "saw mk2");
    assert_eq!(updated.level, 2);
    assert!(updated.active);
    Ok(())
}

#[test]
fn deactivated_resources_keep_their_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    planner.department("Machining", "D-100")?;
    let saw = planner.machine("saw", "D-100", &["production"])?;
    let task = planner.add_task_on("cut", "2026-03-02 09:00", 60, saw)?;

    planner.engine.sync_resources(&[])?;

    assert_eq!(planner.task(task)?.resource_id, Some(saw));
    assert!(planner
        .engine
        .visible_resources(&ResourceFilter::default())?
        .is_empty());
    Ok(())
}

#[test]
fn bad_master_level_rejects_the_pull() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    let result = planner.engine.sync_resources(&[ResourceMaster {
        kind: ResourceKind::Machine,
        name: "odd".into(),
        erp_id: "M-odd".into(),
        erp_department_id: None,
        level: 9,
        capabilities: Vec::new(),
    }]);
    assert!(matches!(result, Err(EngineError::Core(_))));
    assert!(planner.engine.store().all_resources()?.is_empty());
    Ok(())
}

// ============================================================================
// Working calendar
// ============================================================================

#[test]
fn configured_week_replaces_the_standard_one() -> Result<(), Box<dyn std::error::Error>> {
    let mut planner = TestPlanner::new()?;
    // Saturday morning becomes working time.
    let mut days = *WeekCalendar::standard().days();
    days[Weekday::Sat.num_days_from_monday() as usize] = WorkingHours {
        weekday: Weekday::Sat,
        start: NaiveTime::from_hms_opt(6, 0, 0).ok_or("bad time")?,
        end: NaiveTime::from_hms_opt(12, 0, 0).ok_or("bad time")?,
        is_working_day: true,
    };
    planner.engine.set_working_hours(&WeekCalendar::new(days)?)?;

    assert_eq!(*planner.engine.working_hours()?.days(), days);

    // 2026-03-07 is a Saturday; inside the new window no warning fires.
    planner.add_task("saturday shift", "2026-03-07 08:00", 60)?;
    let report = planner.engine.check_conflicts(dt("2026-03-02 12:00"))?;
    assert_eq!(report.count_of(ConflictKind::Calendar), 0);
    Ok(())
}
