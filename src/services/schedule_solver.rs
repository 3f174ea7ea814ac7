use std::time::Instant;

use chrono::Duration;
use good_lp::{default_solver, ResolutionError, Solution, SolverModel, WithTimeLimit};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::schedule::{FilteredTask, ScheduleEntry, SolveResult, SolveStatus};
use crate::models::task::ParsedTask;
use crate::services::schedule_model::{
    lateness_factor, ModelVariant, ObjectiveWeights, ScheduleModel,
};
use crate::services::schedule_utils;
use crate::services::slot_grid::{SlotGrid, SLOT_MINUTES};

/// Everything the driver needs besides the model itself.
pub struct SolveContext<'a> {
    pub grid: &'a SlotGrid,
    pub tasks: &'a [ParsedTask],
    pub weights: &'a ObjectiveWeights,
    pub time_limit_seconds: u64,
    pub original_task_count: usize,
}

/// Runs the MILP under the configured wall-clock limit and interprets the
/// numeric solution back into sorted schedule entries and report metrics.
pub fn run_solver(
    model: ScheduleModel,
    ctx: &SolveContext<'_>,
    filtered: Vec<FilteredTask>,
) -> SolveResult {
    let ScheduleModel {
        variables,
        objective,
        constraints,
        starts,
        leisure,
        leisure_flags: _,
        adjacency,
        variant,
    } = model;

    let started = Instant::now();
    let mut problem = variables
        .maximise(objective)
        .using(default_solver)
        .with_time_limit(ctx.time_limit_seconds as f64);
    for constraint in constraints {
        problem = problem.with(constraint);
    }

    let outcome = problem.solve();
    let solve_time = started.elapsed().as_secs_f64();

    match outcome {
        Ok(solution) => {
            interpret_solution(&solution, ctx, filtered, solve_time, &starts, &leisure, &adjacency, variant)
        }
        Err(ResolutionError::Infeasible) => {
            info!(target: "app::solver", solve_time, "model infeasible");
            let mut result = SolveResult::empty(
                SolveStatus::Infeasible,
                "未找到可行的时间表。请检查: 截止时间是否过紧、固定日程是否冲突、每日上限或高难度任务限制是否过严。",
            );
            result.solve_time_seconds = round2(solve_time);
            result.filtered_tasks_info = filtered;
            result
        }
        Err(ResolutionError::Unbounded) => {
            warn!(target: "app::solver", "model unbounded");
            let mut result = SolveResult::empty(
                SolveStatus::InfeasibleOrUnbounded,
                "模型不可行或无界, 请检查目标权重设置。",
            );
            result.solve_time_seconds = round2(solve_time);
            result.filtered_tasks_info = filtered;
            result
        }
        Err(err) => {
            let error = AppError::solver(format!("求解器异常结束: {err}"));
            let mut result = SolveResult::empty(SolveStatus::Error, error.to_string());
            result.solve_time_seconds = round2(solve_time);
            result.filtered_tasks_info = filtered;
            result
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn interpret_solution<S: Solution>(
    solution: &S,
    ctx: &SolveContext<'_>,
    filtered: Vec<FilteredTask>,
    solve_time: f64,
    starts: &[Vec<good_lp::Variable>],
    leisure: &[good_lp::Variable],
    adjacency: &[good_lp::Variable],
    variant: ModelVariant,
) -> SolveResult {
    let mut entries: Vec<ScheduleEntry> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut stress_score = 0.0;

    for (i, task) in ctx.tasks.iter().enumerate() {
        let chosen = starts[i]
            .iter()
            .position(|variable| solution.value(*variable) > 0.5);
        let start_slot = match chosen {
            Some(slot) => slot,
            None => {
                missing.push(task.name.clone());
                continue;
            }
        };

        let end_slot = start_slot + task.duration_slots - 1;
        let start_time = match ctx.grid.slot_to_datetime(start_slot) {
            Ok(dt) => dt,
            Err(err) => {
                warnings.push(format!("任务 {} 的槽位无法转换为时间: {err}", task.name));
                continue;
            }
        };

        let natural_end = start_time + Duration::minutes(task.duration_slots as i64 * SLOT_MINUTES);
        let window_end = ctx.grid.day_window_end(start_slot);
        let end_time = if natural_end > window_end {
            warn!(
                target: "app::solver",
                task_id = %task.id,
                start_slot,
                "reported end time crosses the daily window; clamping for display"
            );
            warnings.push(format!(
                "任务 {} 的结束时间超出当日窗口, 显示时间已截断 (槽位区间仍然有效)",
                task.name
            ));
            window_end
        } else {
            natural_end
        };

        stress_score += (task.priority * task.difficulty) as f64
            * ctx.weights.stress[start_slot]
            * (1.0 + ctx.weights.gamma * lateness_factor(task, start_slot));

        entries.push(ScheduleEntry {
            id: task.id.clone(),
            name: task.name.clone(),
            priority: task.priority,
            difficulty: task.difficulty,
            start_slot,
            end_slot,
            start_time: schedule_utils::format_naive(start_time),
            end_time: schedule_utils::format_naive(end_time),
            duration_min: task.duration_slots as i64 * SLOT_MINUTES,
            preference: task.preference,
            stress_multiplier_at_start: ctx.weights.stress[start_slot],
        });
    }

    entries.sort_by_key(|entry| entry.start_slot);

    let raw_leisure: f64 = leisure.iter().map(|v| solution.value(*v)).sum();
    let weighted_leisure: f64 = leisure
        .iter()
        .enumerate()
        .map(|(s, v)| ctx.weights.leisure[s] * solution.value(*v))
        .sum();
    let contiguous_pairs = adjacency
        .iter()
        .map(|z| solution.value(*z))
        .sum::<f64>()
        .round() as i64;

    let mut objective_value =
        ctx.weights.alpha * weighted_leisure - ctx.weights.beta * stress_score;
    if variant == ModelVariant::ContiguousLeisure {
        objective_value += ctx.weights.gamma_contiguity * contiguous_pairs as f64;
    }

    let mut status = if solve_time >= ctx.time_limit_seconds as f64 {
        SolveStatus::TimeLimitReached
    } else {
        SolveStatus::Optimal
    };

    let mut message = format!(
        "成功排入 {} 个任务, 原始任务共 {} 个。",
        entries.len(),
        ctx.original_task_count
    );
    if !filtered.is_empty() {
        message.push_str(&format!(" 另有 {} 个任务在建模前被过滤。", filtered.len()));
    }
    if !missing.is_empty() {
        // Mandatory assignment guarantees a start for every admitted task, so
        // a missing row means the incumbent cannot be trusted as optimal.
        status = SolveStatus::Suboptimal;
        let joined = missing.join(", ");
        message.push_str(&format!(
            " 警告: {} 个必排任务未获得起始槽位 ({joined}), 结果已降级。",
            missing.len()
        ));
        warn!(
            target: "app::solver",
            missing = %joined,
            "solution reported without a start slot for mandatory tasks"
        );
    }

    let completion_rate = if ctx.original_task_count > 0 {
        entries.len() as f64 / ctx.original_task_count as f64
    } else {
        0.0
    };

    info!(
        target: "app::solver",
        scheduled = entries.len(),
        raw_leisure,
        stress_score,
        contiguous_pairs,
        solve_time,
        "schedule solved"
    );

    SolveResult {
        status,
        schedule: entries,
        raw_total_leisure_minutes: round1(raw_leisure),
        weighted_leisure_score: round2(ctx.weights.alpha * weighted_leisure),
        weighted_stress_score: round2(stress_score),
        contiguous_leisure_pairs: contiguous_pairs,
        objective_value: Some(round3(objective_value)),
        solve_time_seconds: round2(solve_time),
        completion_rate,
        message,
        filtered_tasks_info: filtered,
        warnings,
        error_details: Vec::new(),
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
