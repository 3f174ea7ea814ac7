use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use slotplan::models::commitment::BlockedInterval;
use slotplan::models::schedule::SolveStatus;
use slotplan::models::task::{DeadlineInput, TaskInput};
use slotplan::services::optimizer_service::{OptimizeRequest, OptimizerService};
use slotplan::services::schedule_model::ModelVariant;

fn anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 5)
        .expect("date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight")
}

fn service() -> OptimizerService {
    OptimizerService::new().with_anchor(anchor())
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

#[test]
fn empty_request_reports_the_full_horizon_as_leisure() {
    let result = service().optimize(&OptimizeRequest::default());
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!(result.schedule.is_empty());
    assert!((result.raw_total_leisure_minutes - 5880.0).abs() < 1e-6);
    assert_eq!(result.contiguous_leisure_pairs, 0);
    assert!(result.filtered_tasks_info.is_empty());
}

#[test]
fn single_morning_task_lands_early_on_day_zero() {
    let request = OptimizeRequest {
        tasks: vec![task("a", "Essay", 2, 2, 60, 0, Some("morning"))],
        ..Default::default()
    };
    let result = service().optimize(&request);
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!(result.status.has_solution());
    assert_eq!(result.schedule.len(), 1);
    let entry = &result.schedule[0];
    assert!(entry.start_slot <= 13, "start_slot = {}", entry.start_slot);
    assert_eq!(entry.end_slot, entry.start_slot + 3);
    assert_eq!(entry.duration_min, 60);
    assert!((result.completion_rate - 1.0).abs() < 1e-9);
}

#[test]
fn high_stress_short_task_is_reported_not_scheduled() {
    let request = OptimizeRequest {
        tasks: vec![task("b", "Cram", 5, 5, 15, 6, None)],
        ..Default::default()
    };
    let result = service().optimize(&request);
    assert_eq!(result.status, SolveStatus::NoSchedulableTasks);
    assert!(result.schedule.is_empty());
    assert_eq!(result.filtered_tasks_info.len(), 1);
    let report = &result.filtered_tasks_info[0];
    assert_eq!(report.id, "b");
    assert_eq!(report.required_duration_min, Some(31));
    assert_eq!(report.current_duration_min, 15);
    // With nothing scheduled the baseline leisure is still reported.
    assert!((result.raw_total_leisure_minutes - 5880.0).abs() < 1e-6);
    assert_eq!(result.completion_rate, 0.0);
}

#[test]
fn commitments_push_tasks_out_of_blocked_slots() {
    let request = OptimizeRequest {
        tasks: vec![task("d", "Problem set", 2, 2, 60, 0, None)],
        blocked_intervals: vec![BlockedInterval {
            id: Some("block-1".into()),
            start_time: Some("2025-05-05T09:00:00".into()),
            end_time: Some("2025-05-05T11:00:00".into()),
            activity: Some("Lecture".into()),
        }],
        ..Default::default()
    };
    let result = service().optimize(&request);
    assert_eq!(result.status, SolveStatus::Optimal);
    let entry = &result.schedule[0];
    for slot in entry.start_slot..=entry.end_slot {
        assert!(!(4..=11).contains(&slot), "slot {slot} is blocked");
    }
}

#[test]
fn hard_tasks_start_on_different_days() {
    let request = OptimizeRequest {
        tasks: vec![
            task("h1", "Thesis chapter", 1, 5, 60, 2, None),
            task("h2", "Exam prep", 1, 5, 60, 2, None),
        ],
        ..Default::default()
    };
    let result = service().optimize(&request);
    assert_eq!(result.status, SolveStatus::Optimal);
    assert_eq!(result.schedule.len(), 2);
    let day_a = result.schedule[0].start_slot / 56;
    let day_b = result.schedule[1].start_slot / 56;
    assert_ne!(day_a, day_b);
}

#[test]
fn contiguous_variant_rewards_edge_placement() {
    let service = OptimizerService::with_variant(ModelVariant::ContiguousLeisure)
        .with_anchor(anchor());
    let request = OptimizeRequest {
        tasks: vec![task("c", "Reading", 2, 2, 60, 6, None)],
        ..Default::default()
    };
    let result = service.optimize(&request);
    assert_eq!(result.status, SolveStatus::Optimal);
    let entry = &result.schedule[0];
    assert_eq!(entry.start_slot, 0);
    // 392 slots leave 391 adjacent pairs; a 4-slot block at the edge breaks 4.
    assert_eq!(result.contiguous_leisure_pairs, 387);
    assert!((result.raw_total_leisure_minutes - 5820.0).abs() < 1e-6);
}

#[test]
fn contiguous_variant_baseline_counts_unblocked_pairs() {
    let service = OptimizerService::with_variant(ModelVariant::ContiguousLeisure)
        .with_anchor(anchor());
    let result = service.optimize(&OptimizeRequest::default());
    assert_eq!(result.status, SolveStatus::Optimal);
    assert_eq!(result.contiguous_leisure_pairs, 391);
}

#[test]
fn wire_contract_round_trips_through_json() {
    let payload = json!({
        "tasks": [{
            "id": "t-1",
            "name": "Essay",
            "priority": 2,
            "difficulty": 2,
            "duration": 60,
            "deadline": 1,
            "preference": "morning"
        }],
        "blockedIntervals": [{
            "id": "b-1",
            "startTime": "2025-05-05T12:00:00",
            "endTime": "2025-05-05T13:00:00",
            "activity": "Lunch"
        }],
        "settings": {
            "startHour": 8,
            "endHour": 22,
            "alpha": 1.0,
            "beta": 0.1,
            "gamma_contiguity": 0.05,
            "timeLimitSeconds": 30
        }
    });
    let request: OptimizeRequest = serde_json::from_value(payload).expect("request");
    assert_eq!(request.blocked_intervals.len(), 1);

    let result = service().optimize(&request);
    let value = serde_json::to_value(&result).expect("response json");
    assert_eq!(value["status"], "Optimal");
    for key in [
        "schedule",
        "raw_total_leisure_minutes",
        "weighted_leisure_score",
        "weighted_stress_score",
        "contiguous_leisure_pairs",
        "objective_value",
        "solve_time_seconds",
        "completion_rate",
        "message",
        "filtered_tasks_info",
    ] {
        assert!(value.get(key).is_some(), "missing response key {key}");
    }
    let entry = &value["schedule"][0];
    assert!(entry.get("startTime").is_some());
    assert!(entry.get("endTime").is_some());
    assert!(entry.get("start_slot").is_some());
    assert!(entry.get("stress_multiplier_at_start").is_some());
}
