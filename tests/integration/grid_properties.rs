use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use slotplan::models::commitment::BlockedInterval;
use slotplan::models::schedule::{ScheduleEntry, SolveStatus};
use slotplan::models::settings::OptimizeSettings;
use slotplan::models::task::{DeadlineInput, Preference, TaskInput};
use slotplan::services::optimizer_service::{OptimizeRequest, OptimizerService};

const SLOTS_PER_DAY: usize = 56;
const TOTAL_SLOTS: usize = 392;

fn anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 5)
        .expect("date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight")
}

fn task(
    id: &str,
    name: &str,
    priority: i64,
    difficulty: i64,
    duration: i64,
    deadline_days: i64,
    preference: Option<&str>,
) -> TaskInput {
    TaskInput {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        priority: Some(priority),
        difficulty: Some(difficulty),
        duration: Some(duration),
        deadline: Some(DeadlineInput::RelativeDays(deadline_days)),
        preference: preference.map(|p| p.to_string()),
    }
}

fn slot_hour(slot: usize) -> usize {
    8 + (slot % SLOTS_PER_DAY) / 4
}

fn deadline_slot_for_day(day: usize) -> usize {
    (day + 1) * SLOTS_PER_DAY - 1
}

fn occupied_slots(entry: &ScheduleEntry) -> Vec<usize> {
    (entry.start_slot..=entry.end_slot).collect()
}

/// One richer scenario, checked against every structural guarantee of the
/// schedule at once.
#[test]
fn mixed_schedule_satisfies_all_structural_invariants() {
    let request = OptimizeRequest {
        tasks: vec![
            task("a", "Essay", 2, 2, 60, 2, Some("morning")),
            task("b", "Lab report", 3, 4, 90, 3, None),
            task("c", "Project", 1, 5, 120, 4, Some("evening")),
            // Below the completion-probability floor; must be filtered.
            task("d", "Cram", 5, 5, 15, 5, None),
        ],
        blocked_intervals: vec![BlockedInterval {
            id: Some("lecture".into()),
            start_time: Some("2025-05-05T09:00:00".into()),
            end_time: Some("2025-05-05T11:00:00".into()),
            activity: Some("Lecture".into()),
        }],
        settings: OptimizeSettings {
            daily_limit_slots: Some(8),
            hard_task_threshold: 4,
            ..Default::default()
        },
    };
    let service = OptimizerService::new().with_anchor(anchor());
    let result = service.optimize(&request);

    assert_eq!(result.status, SolveStatus::Optimal, "{}", result.message);
    assert_eq!(result.schedule.len(), 3);

    let blocked: HashSet<usize> = (4..=11).collect();
    let deadline_by_id = [
        ("a", deadline_slot_for_day(2)),
        ("b", deadline_slot_for_day(3)),
        ("c", deadline_slot_for_day(4)),
    ];

    // Entry geometry: end slot follows from the duration, bounds hold, and
    // the list is sorted.
    for entry in &result.schedule {
        let duration_slots = (entry.duration_min as usize).div_ceil(15);
        assert_eq!(entry.end_slot, entry.start_slot + duration_slots - 1);
        assert!(entry.end_slot < TOTAL_SLOTS);
    }
    for pair in result.schedule.windows(2) {
        assert!(pair[0].start_slot <= pair[1].start_slot);
    }

    // Pairwise disjoint occupation.
    for (i, a) in result.schedule.iter().enumerate() {
        for b in result.schedule.iter().skip(i + 1) {
            let a_slots: HashSet<usize> = occupied_slots(a).into_iter().collect();
            assert!(
                occupied_slots(b).iter().all(|s| !a_slots.contains(s)),
                "entries {} and {} overlap",
                a.id,
                b.id
            );
        }
    }

    // No occupied slot is blocked, deadlines hold, preferences hold.
    for entry in &result.schedule {
        for slot in occupied_slots(entry) {
            assert!(!blocked.contains(&slot), "entry {} sits on a blocked slot", entry.id);
        }
        let (_, deadline) = deadline_by_id
            .iter()
            .find(|(id, _)| *id == entry.id)
            .expect("known entry");
        assert!(entry.end_slot <= *deadline);
        match entry.preference {
            Preference::Morning => assert!((8..12).contains(&slot_hour(entry.start_slot))),
            Preference::Afternoon => assert!((12..16).contains(&slot_hour(entry.start_slot))),
            Preference::Evening => assert!((16..22).contains(&slot_hour(entry.start_slot))),
            Preference::Any => {}
        }
    }

    // At most one hard task starts per day, and the daily slot cap holds.
    for day in 0..7 {
        let day_range = (day * SLOTS_PER_DAY)..((day + 1) * SLOTS_PER_DAY);
        let hard_starts = result
            .schedule
            .iter()
            .filter(|e| e.difficulty >= 4 && day_range.contains(&e.start_slot))
            .count();
        assert!(hard_starts <= 1, "day {day} has {hard_starts} hard starts");

        let day_slots: usize = result
            .schedule
            .iter()
            .map(|e| occupied_slots(e).iter().filter(|s| day_range.contains(s)).count())
            .sum();
        assert!(day_slots <= 8, "day {day} holds {day_slots} task slots");
    }

    // Leisure accounting: every slot neither blocked nor occupied earns 15
    // minutes.
    let occupied: HashSet<usize> = result
        .schedule
        .iter()
        .flat_map(occupied_slots)
        .collect();
    let free = TOTAL_SLOTS - blocked.len() - occupied.len();
    assert!((result.raw_total_leisure_minutes - free as f64 * 15.0).abs() < 1e-6);

    // Completion rate counts against the original input, and the filter list
    // is exactly the complement of the schedule.
    assert!((result.completion_rate - 0.75).abs() < 1e-9);
    assert_eq!(result.filtered_tasks_info.len(), 1);
    assert_eq!(result.filtered_tasks_info[0].id, "d");
    let scheduled_ids: HashSet<&str> = result.schedule.iter().map(|e| e.id.as_str()).collect();
    assert!(!scheduled_ids.contains("d"));
    assert_eq!(scheduled_ids.len() + result.filtered_tasks_info.len(), 4);
}

#[test]
fn daily_limit_spreads_work_across_days() {
    let request = OptimizeRequest {
        tasks: vec![
            task("a", "Essay", 2, 2, 60, 6, None),
            task("b", "Reading", 2, 2, 60, 6, None),
        ],
        settings: OptimizeSettings {
            daily_limit_slots: Some(4),
            ..Default::default()
        },
        ..Default::default()
    };
    let service = OptimizerService::new().with_anchor(anchor());
    let result = service.optimize(&request);
    assert_eq!(result.status, SolveStatus::Optimal, "{}", result.message);
    assert_eq!(result.schedule.len(), 2);
    let day_a = result.schedule[0].start_slot / SLOTS_PER_DAY;
    let day_b = result.schedule[1].start_slot / SLOTS_PER_DAY;
    assert_ne!(day_a, day_b);
}
