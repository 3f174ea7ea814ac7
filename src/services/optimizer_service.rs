use std::collections::HashSet;

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::commitment::BlockedInterval;
use crate::models::schedule::{SolveResult, SolveStatus};
use crate::models::settings::OptimizeSettings;
use crate::models::task::{DeadlineInput, ParsedTask, Preference, TaskInput};
use crate::services::preference_map::PreferenceMap;
use crate::services::schedule_model::{
    build_model, ModelVariant, ObjectiveWeights, SchedulingLimits,
};
use crate::services::schedule_solver::{round1, round2, round3, run_solver, SolveContext};
use crate::services::schedule_utils;
use crate::services::slot_grid::{SlotGrid, SLOT_MINUTES};
use crate::services::task_filter;

const MIN_PRIORITY: i64 = 1;
const MAX_PRIORITY: i64 = 5;
const MIN_DIFFICULTY: i64 = 1;
const MAX_DIFFICULTY: i64 = 5;
const DEFAULT_DURATION_MIN: i64 = 15;

/// One stateless optimization request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    #[serde(default)]
    pub tasks: Vec<TaskInput>,
    #[serde(default)]
    pub blocked_intervals: Vec<BlockedInterval>,
    #[serde(default)]
    pub settings: OptimizeSettings,
}

/// Front door of the scheduling engine: validates one request, builds the
/// slot grid and the MILP, runs the solver and shapes the response. Each call
/// is independent; concurrent use just needs independent instances.
#[derive(Debug, Clone)]
pub struct OptimizerService {
    variant: ModelVariant,
    anchor: Option<NaiveDateTime>,
}

impl Default for OptimizerService {
    fn default() -> Self {
        OptimizerService::new()
    }
}

impl OptimizerService {
    pub fn new() -> Self {
        OptimizerService {
            variant: ModelVariant::Base,
            anchor: None,
        }
    }

    pub fn with_variant(variant: ModelVariant) -> Self {
        OptimizerService {
            variant,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, day0_midnight: NaiveDateTime) -> Self {
        self.anchor = Some(day0_midnight);
        self
    }

    fn day0_midnight(&self) -> NaiveDateTime {
        self.anchor.unwrap_or_else(|| {
            Local::now()
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time")
        })
    }

    pub fn optimize(&self, request: &OptimizeRequest) -> SolveResult {
        match self.try_optimize(request) {
            Ok(result) => result,
            Err(err) => {
                let status = match err {
                    AppError::Configuration { .. } => SolveStatus::ConfigurationError,
                    _ => SolveStatus::Error,
                };
                SolveResult::empty(status, err.to_string())
            }
        }
    }

    fn try_optimize(&self, request: &OptimizeRequest) -> AppResult<SolveResult> {
        let settings = &request.settings;
        let grid = SlotGrid::new(settings.start_hour, settings.end_hour, self.day0_midnight())?;
        let weights = ObjectiveWeights::from_settings(settings, &grid)?;

        info!(
            target: "app::optimizer",
            tasks = request.tasks.len(),
            blocked_intervals = request.blocked_intervals.len(),
            start_hour = settings.start_hour,
            end_hour = settings.end_hour,
            total_slots = grid.total_slots(),
            "optimize request received"
        );

        let mut warnings: Vec<String> = Vec::new();
        let mut task_errors: Vec<String> = Vec::new();
        let parsed_tasks = self.parse_tasks(&grid, &request.tasks, &mut warnings, &mut task_errors);

        if !task_errors.is_empty() {
            warn!(
                target: "app::optimizer",
                errors = task_errors.len(),
                "request rejected over malformed tasks"
            );
            let mut result = SolveResult::empty(SolveStatus::Error, "任务定义存在错误, 请求已拒绝。");
            result.error_details = task_errors;
            result.warnings = warnings;
            return Ok(result);
        }

        let blocked = collect_blocked_slots(&grid, &request.blocked_intervals, &mut warnings);

        if request.tasks.is_empty() {
            let mut result = self.baseline_result(
                &grid,
                &blocked,
                &weights,
                SolveStatus::Optimal,
                "未提供任务, 返回基础空闲时间。".to_string(),
            );
            result.warnings = warnings;
            return Ok(result);
        }

        let outcome = task_filter::filter_tasks(&parsed_tasks, &grid);
        if outcome.eligible.is_empty() {
            let mut message = "没有满足条件的可排程任务。".to_string();
            if !outcome.filtered.is_empty() {
                let reasons: Vec<String> = outcome
                    .filtered
                    .iter()
                    .map(|t| format!("{}: {}", t.name, t.reason))
                    .collect();
                message.push_str(&format!(" 被过滤的任务: {}。", reasons.join("; ")));
            }
            let mut result = self.baseline_result(
                &grid,
                &blocked,
                &weights,
                SolveStatus::NoSchedulableTasks,
                message,
            );
            result.filtered_tasks_info = outcome.filtered;
            result.warnings = warnings;
            return Ok(result);
        }

        let preferences = PreferenceMap::build(&grid);
        let limits = SchedulingLimits {
            daily_limit_slots: settings.daily_limit_slots,
            hard_task_threshold: settings.hard_task_threshold,
        };
        let model = build_model(
            &grid,
            &outcome.eligible,
            &blocked,
            &preferences,
            &weights,
            &limits,
            self.variant,
        );
        let ctx = SolveContext {
            grid: &grid,
            tasks: &outcome.eligible,
            weights: &weights,
            time_limit_seconds: settings.time_limit_seconds,
            original_task_count: request.tasks.len(),
        };
        let mut result = run_solver(model, &ctx, outcome.filtered);
        if !warnings.is_empty() {
            warnings.append(&mut result.warnings);
            result.warnings = warnings;
        }
        Ok(result)
    }

    fn parse_tasks(
        &self,
        grid: &SlotGrid,
        inputs: &[TaskInput],
        warnings: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) -> Vec<ParsedTask> {
        let mut parsed = Vec::new();
        for (idx, input) in inputs.iter().enumerate() {
            let name = match input.name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => name.to_string(),
                None => {
                    errors.push(format!("任务 {}: 缺少名称", idx + 1));
                    continue;
                }
            };
            let id = input
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let priority = input
                .priority
                .unwrap_or(MIN_PRIORITY)
                .clamp(MIN_PRIORITY, MAX_PRIORITY);
            let difficulty = input
                .difficulty
                .unwrap_or(MIN_DIFFICULTY)
                .clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);

            let duration_min = input.duration.unwrap_or(DEFAULT_DURATION_MIN);
            if duration_min <= 0 {
                errors.push(format!("任务 '{name}': 时长必须为正数"));
                continue;
            }

            let deadline_dt = match &input.deadline {
                Some(DeadlineInput::RelativeDays(days)) => {
                    if *days < 0 {
                        errors.push(format!("任务 '{name}': 相对截止天数不能为负"));
                        continue;
                    }
                    grid.day0_midnight()
                        + Duration::days(*days)
                        + Duration::hours(grid.end_hour() as i64)
                }
                Some(DeadlineInput::Timestamp(raw)) => {
                    match schedule_utils::parse_naive_local(raw) {
                        Ok(dt) => dt,
                        Err(_) => {
                            errors.push(format!("任务 '{name}': 截止时间格式无效 '{raw}'"));
                            continue;
                        }
                    }
                }
                None => {
                    errors.push(format!("任务 '{name}': 缺少截止时间"));
                    continue;
                }
            };

            if deadline_dt < grid.day0_start() {
                errors.push(format!(
                    "任务 '{name}': 截止时间早于排程起点 {}",
                    schedule_utils::format_naive(grid.day0_start())
                ));
                continue;
            }
            let deadline_slot = grid.datetime_to_slot(deadline_dt);

            let duration_slots = (((duration_min + SLOT_MINUTES - 1) / SLOT_MINUTES) as usize).max(1);

            let preference = match input.preference.as_deref() {
                None => Preference::Any,
                Some(raw) => match Preference::parse(raw) {
                    Some(preference) => preference,
                    None => {
                        warn!(target: "app::optimizer", task = %name, preference = %raw, "unknown preference");
                        warnings.push(format!("任务 '{name}' 的偏好 '{raw}' 无法识别, 已按 any 处理"));
                        Preference::Any
                    }
                },
            };

            parsed.push(ParsedTask {
                id,
                name,
                priority,
                difficulty,
                duration_min,
                duration_slots,
                deadline_slot,
                preference,
            });
        }
        parsed
    }

    fn baseline_result(
        &self,
        grid: &SlotGrid,
        blocked: &HashSet<usize>,
        weights: &ObjectiveWeights,
        status: SolveStatus,
        message: String,
    ) -> SolveResult {
        let total_slots = grid.total_slots();
        let free_slots = total_slots - blocked.len().min(total_slots);
        let raw_leisure = free_slots as f64 * SLOT_MINUTES as f64;
        let weighted_sum: f64 = (0..total_slots)
            .filter(|s| !blocked.contains(s))
            .map(|s| weights.leisure[s] * SLOT_MINUTES as f64)
            .sum();

        let contiguous_pairs = match self.variant {
            ModelVariant::ContiguousLeisure => (0..total_slots.saturating_sub(1))
                .filter(|&s| !blocked.contains(&s) && !blocked.contains(&(s + 1)))
                .count() as i64,
            ModelVariant::Base => 0,
        };

        let mut objective = weights.alpha * weighted_sum;
        if self.variant == ModelVariant::ContiguousLeisure {
            objective += weights.gamma_contiguity * contiguous_pairs as f64;
        }

        let mut result = SolveResult::empty(status, message);
        result.raw_total_leisure_minutes = round1(raw_leisure);
        result.weighted_leisure_score = round2(weights.alpha * weighted_sum);
        result.contiguous_leisure_pairs = contiguous_pairs;
        result.objective_value = Some(round3(objective));
        result
    }
}

/// Flattens blocked intervals into the set of blocked slot indices. An
/// interval ending exactly on a slot boundary leaves that slot free; malformed
/// or fully out-of-horizon intervals are dropped with a warning.
fn collect_blocked_slots(
    grid: &SlotGrid,
    intervals: &[BlockedInterval],
    warnings: &mut Vec<String>,
) -> HashSet<usize> {
    let mut blocked = HashSet::new();
    for (idx, interval) in intervals.iter().enumerate() {
        let label = interval
            .activity
            .clone()
            .or_else(|| interval.id.clone())
            .unwrap_or_else(|| format!("区间 {}", idx + 1));

        let (start_raw, end_raw) = match (&interval.start_time, &interval.end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                warnings.push(format!("固定日程 '{label}' 缺少起止时间, 已忽略"));
                continue;
            }
        };
        let start = match schedule_utils::parse_naive_local(start_raw) {
            Ok(dt) => dt,
            Err(_) => {
                warnings.push(format!("固定日程 '{label}' 起始时间格式无效, 已忽略"));
                continue;
            }
        };
        let end = match schedule_utils::parse_naive_local(end_raw) {
            Ok(dt) => dt,
            Err(_) => {
                warnings.push(format!("固定日程 '{label}' 结束时间格式无效, 已忽略"));
                continue;
            }
        };
        if end <= start {
            warnings.push(format!("固定日程 '{label}' 结束时间必须晚于开始时间, 已忽略"));
            continue;
        }
        if end <= grid.day0_midnight() || start >= grid.horizon_end() {
            warnings.push(format!("固定日程 '{label}' 完全在排程范围之外, 已忽略"));
            continue;
        }

        let first = grid.datetime_to_slot(start);
        let last = grid.datetime_to_slot(end - Duration::microseconds(1));
        for slot in first..=last {
            blocked.insert(slot);
        }
    }
    blocked
}
