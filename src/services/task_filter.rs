use tracing::{debug, info};

use crate::models::schedule::FilteredTask;
use crate::models::task::ParsedTask;
use crate::services::slot_grid::SlotGrid;

/// Floor on the modeled completion probability
/// `Pi = 1 - exp(-duration / (difficulty * priority))`. Tasks below the floor
/// are reported back instead of being scheduled. The 0.7 value is a product
/// tuning knob, not a mathematical constant.
pub const SUCCESS_PROBABILITY_FLOOR: f64 = 0.7;

/// Minutes needed for the completion probability to reach the floor:
/// `Pi >= floor` rearranges to `duration >= difficulty * priority * ln(1 / (1 - floor))`.
pub fn required_minutes(difficulty: i64, priority: i64) -> f64 {
    (difficulty * priority) as f64 * (1.0 / (1.0 - SUCCESS_PROBABILITY_FLOOR)).ln()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub eligible: Vec<ParsedTask>,
    pub filtered: Vec<FilteredTask>,
}

/// Splits tasks into the set admitted to the optimization model and the set
/// reported back to the caller, applying the completion-probability floor and
/// the deadline-feasibility check. Admitted tasks have their deadline and
/// duration clamped onto the grid.
pub fn filter_tasks(tasks: &[ParsedTask], grid: &SlotGrid) -> FilterOutcome {
    let total_slots = grid.total_slots();
    let mut eligible = Vec::new();
    let mut filtered = Vec::new();

    for task in tasks {
        if task.difficulty <= 0 || task.priority <= 0 {
            filtered.push(FilteredTask {
                id: task.id.clone(),
                name: task.name.clone(),
                reason: format!(
                    "难度 ({}) 或优先级 ({}) 必须为正数",
                    task.difficulty, task.priority
                ),
                required_duration_min: None,
                current_duration_min: task.duration_min,
            });
            continue;
        }

        let required = required_minutes(task.difficulty, task.priority);
        let required_int = required.ceil() as i64;

        if (task.duration_min as f64) < required {
            debug!(
                target: "app::filter",
                task_id = %task.id,
                required_min = required_int,
                actual_min = task.duration_min,
                "task below completion-probability floor"
            );
            filtered.push(FilteredTask {
                id: task.id.clone(),
                name: task.name.clone(),
                reason: format!(
                    "任务时长不足以达到成功概率要求: 需要约 {} 分钟, 实际 {} 分钟 (难度 {}, 优先级 {})",
                    required_int, task.duration_min, task.difficulty, task.priority
                ),
                required_duration_min: Some(required_int),
                current_duration_min: task.duration_min,
            });
            continue;
        }

        let mut admitted = task.clone();
        admitted.deadline_slot = admitted.deadline_slot.min(total_slots - 1);
        admitted.duration_slots = admitted.duration_slots.clamp(1, total_slots);

        if admitted.deadline_slot + 1 < admitted.duration_slots {
            filtered.push(FilteredTask {
                id: task.id.clone(),
                name: task.name.clone(),
                reason: format!(
                    "截止时间过早: 截止槽位 {} 无法容纳 {} 个时间槽",
                    admitted.deadline_slot, admitted.duration_slots
                ),
                required_duration_min: Some(required_int),
                current_duration_min: task.duration_min,
            });
            continue;
        }

        eligible.push(admitted);
    }

    info!(
        target: "app::filter",
        eligible = eligible.len(),
        filtered = filtered.len(),
        "eligibility filter applied"
    );
    FilterOutcome { eligible, filtered }
}
