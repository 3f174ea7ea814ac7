use std::collections::HashSet;

use good_lp::{constraint, variable, variables, Constraint, Expression, ProblemVariables, Variable};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::settings::OptimizeSettings;
use crate::models::task::{ParsedTask, Preference};
use crate::services::preference_map::PreferenceMap;
use crate::services::slot_grid::{SlotGrid, TOTAL_DAYS};

const SLOT_LEISURE_MINUTES: f64 = 15.0;
const EVENING_LEISURE_FROM_HOUR: u32 = 18;
const CORE_STRESS_HOURS: std::ops::Range<u32> = 9..17;

/// Selects which objective terms and leisure linking the model carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelVariant {
    /// Continuous leisure bounded by occupancy; no contiguity reward.
    #[default]
    Base,
    /// Binary full-leisure indicators plus a reward per adjacent leisure pair.
    ContiguousLeisure,
}

/// Scalar weights plus fully resolved per-slot weight tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub gamma_contiguity: f64,
    pub leisure: Vec<f64>,
    pub stress: Vec<f64>,
}

impl ObjectiveWeights {
    /// Resolves settings into concrete per-slot tables. A caller-provided
    /// table must cover every slot of the grid.
    pub fn from_settings(settings: &OptimizeSettings, grid: &SlotGrid) -> AppResult<Self> {
        let leisure = match &settings.leisure_weights {
            Some(map) => resolve_table(map, grid.total_slots(), "leisureWeights")?,
            None => default_leisure_weights(grid),
        };
        let stress = match &settings.stress_multipliers {
            Some(map) => resolve_table(map, grid.total_slots(), "stressMultipliers")?,
            None => default_stress_multipliers(grid),
        };
        Ok(ObjectiveWeights {
            alpha: settings.alpha,
            beta: settings.beta,
            gamma: settings.gamma,
            gamma_contiguity: settings.gamma_contiguity,
            leisure,
            stress,
        })
    }
}

fn resolve_table(
    map: &std::collections::HashMap<usize, f64>,
    total_slots: usize,
    field: &str,
) -> AppResult<Vec<f64>> {
    let mut table = Vec::with_capacity(total_slots);
    for slot in 0..total_slots {
        match map.get(&slot) {
            Some(weight) => table.push(*weight),
            None => {
                return Err(AppError::validation(format!(
                    "提供的 {field} 缺少槽位 {slot} 的权重"
                )))
            }
        }
    }
    Ok(table)
}

/// Evening slots are worth more as free time.
pub fn default_leisure_weights(grid: &SlotGrid) -> Vec<f64> {
    (0..grid.total_slots())
        .map(|s| {
            if grid.slot_hour(s) >= EVENING_LEISURE_FROM_HOUR {
                1.5
            } else {
                1.0
            }
        })
        .collect()
}

/// Working tasks during core hours cost more stress.
pub fn default_stress_multipliers(grid: &SlotGrid) -> Vec<f64> {
    (0..grid.total_slots())
        .map(|s| {
            if CORE_STRESS_HOURS.contains(&grid.slot_hour(s)) {
                1.2
            } else {
                1.0
            }
        })
        .collect()
}

/// How close a start at `slot` is to the task's latest feasible start, in
/// `[0, 1]`. Zero when the deadline leaves no choice of start at all.
pub fn lateness_factor(task: &ParsedTask, slot: usize) -> f64 {
    let latest = task.latest_feasible_start();
    if latest == 0 {
        0.0
    } else {
        (slot as f64 / latest as f64).clamp(0.0, 1.0)
    }
}

/// Hard limits applied during model construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingLimits {
    pub daily_limit_slots: Option<usize>,
    pub hard_task_threshold: i64,
}

/// A fully built MILP instance, ready to hand to the solver driver. Variables
/// and constraints are kept apart from the backend so construction stays a
/// pure function of its inputs.
pub struct ScheduleModel {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
    /// `starts[i][s]` is one iff task `i` starts at slot `s`.
    pub starts: Vec<Vec<Variable>>,
    /// Leisure minutes credited to each slot, in `[0, 15]`.
    pub leisure: Vec<Variable>,
    /// Full-leisure indicators (contiguous-leisure variant only).
    pub leisure_flags: Vec<Variable>,
    /// Adjacent-leisure-pair indicators (contiguous-leisure variant only).
    pub adjacency: Vec<Variable>,
    pub variant: ModelVariant,
}

pub fn build_model(
    grid: &SlotGrid,
    tasks: &[ParsedTask],
    blocked: &HashSet<usize>,
    preferences: &PreferenceMap,
    weights: &ObjectiveWeights,
    limits: &SchedulingLimits,
    variant: ModelVariant,
) -> ScheduleModel {
    let total_slots = grid.total_slots();
    let slots_per_day = grid.slots_per_day();

    let mut vars = variables!();
    let starts: Vec<Vec<Variable>> = tasks
        .iter()
        .map(|_| {
            (0..total_slots)
                .map(|_| vars.add(variable().binary()))
                .collect()
        })
        .collect();
    let leisure: Vec<Variable> = (0..total_slots)
        .map(|_| vars.add(variable().clamp(0.0, SLOT_LEISURE_MINUTES)))
        .collect();
    let (leisure_flags, adjacency): (Vec<Variable>, Vec<Variable>) = match variant {
        ModelVariant::ContiguousLeisure => (
            (0..total_slots)
                .map(|_| vars.add(variable().binary()))
                .collect(),
            (0..total_slots.saturating_sub(1))
                .map(|_| vars.add(variable().binary()))
                .collect(),
        ),
        ModelVariant::Base => (Vec::new(), Vec::new()),
    };

    let mut constraints: Vec<Constraint> = Vec::new();

    // Number of tasks occupying each slot, shared by the no-overlap and
    // leisure constraints.
    let mut occupancy: Vec<Expression> = Vec::with_capacity(total_slots);
    let mut occupancy_nonempty: Vec<bool> = Vec::with_capacity(total_slots);
    for t in 0..total_slots {
        let mut expr = Expression::from(0.0);
        let mut nonempty = false;
        for (i, task) in tasks.iter().enumerate() {
            let dur = task.duration_slots;
            let first = t.saturating_sub(dur - 1);
            for s in first..=t {
                if s + dur <= total_slots {
                    expr += starts[i][s];
                    nonempty = true;
                }
            }
        }
        occupancy.push(expr);
        occupancy_nonempty.push(nonempty);
    }

    // Every admitted task gets exactly one start slot.
    for row in &starts {
        let assigned: Expression = row.iter().sum();
        constraints.push(constraint!(assigned == 1.0));
    }

    // At most one hard task may start per day.
    let hard_tasks: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| task.difficulty >= limits.hard_task_threshold)
        .map(|(i, _)| i)
        .collect();
    if !hard_tasks.is_empty() {
        for day in 0..TOTAL_DAYS {
            let day_start = day * slots_per_day;
            let mut expr = Expression::from(0.0);
            for &i in &hard_tasks {
                for s in day_start..day_start + slots_per_day {
                    expr += starts[i][s];
                }
            }
            constraints.push(constraint!(expr <= 1.0));
        }
    }

    // Starts that would overrun the deadline or the horizon are fixed to zero.
    for (i, task) in tasks.iter().enumerate() {
        let dur = task.duration_slots;
        for s in 0..total_slots {
            if s + dur > total_slots || s + dur - 1 > task.deadline_slot {
                constraints.push(constraint!(starts[i][s] == 0.0));
            }
        }
    }

    // No slot may be occupied by more than one task.
    for t in 0..total_slots {
        if occupancy_nonempty[t] {
            constraints.push(constraint!(occupancy[t].clone() <= 1.0));
        }
    }

    // Preference windows constrain the start slot only.
    for (i, task) in tasks.iter().enumerate() {
        if task.preference == Preference::Any {
            continue;
        }
        for s in 0..total_slots {
            if !preferences.allows(task.preference, s) {
                constraints.push(constraint!(starts[i][s] == 0.0));
            }
        }
    }

    // Starts whose occupied range touches a blocked slot are fixed to zero.
    for (i, task) in tasks.iter().enumerate() {
        let dur = task.duration_slots;
        for s in 0..total_slots {
            let end = (s + dur).min(total_slots);
            if (s..end).any(|t| blocked.contains(&t)) {
                constraints.push(constraint!(starts[i][s] == 0.0));
            }
        }
    }

    // Leisure linking. Blocked slots earn nothing; elsewhere the variant
    // decides between the occupancy bound and the binary indicator form.
    for s in 0..total_slots {
        if blocked.contains(&s) {
            constraints.push(constraint!(leisure[s] == 0.0));
            if variant == ModelVariant::ContiguousLeisure {
                constraints.push(constraint!(leisure_flags[s] == 0.0));
            }
        } else {
            match variant {
                ModelVariant::Base => {
                    constraints.push(constraint!(
                        occupancy[s].clone() * SLOT_LEISURE_MINUTES + leisure[s]
                            <= SLOT_LEISURE_MINUTES
                    ));
                }
                ModelVariant::ContiguousLeisure => {
                    constraints
                        .push(constraint!(leisure[s] == leisure_flags[s] * SLOT_LEISURE_MINUTES));
                    constraints.push(constraint!(occupancy[s].clone() + leisure_flags[s] <= 1.0));
                }
            }
        }
    }

    // Optional cap on task slots per day, weighted by how much of each
    // placement falls inside the day.
    if let Some(limit) = limits.daily_limit_slots {
        for day in 0..TOTAL_DAYS {
            let day_start = day * slots_per_day;
            let day_end = day_start + slots_per_day;
            let mut expr = Expression::from(0.0);
            let mut nonempty = false;
            for (i, task) in tasks.iter().enumerate() {
                let dur = task.duration_slots;
                for s in 0..total_slots {
                    if s + dur > total_slots {
                        continue;
                    }
                    let begin = s.max(day_start);
                    let end = (s + dur).min(day_end);
                    if end > begin {
                        expr += ((end - begin) as f64) * starts[i][s];
                        nonempty = true;
                    }
                }
            }
            if nonempty {
                constraints.push(constraint!(expr <= limit as f64));
            }
        }
    }

    // An adjacency indicator is one exactly when both neighbours are leisure.
    if variant == ModelVariant::ContiguousLeisure {
        for s in 0..adjacency.len() {
            constraints.push(constraint!(adjacency[s] <= leisure_flags[s]));
            constraints.push(constraint!(adjacency[s] <= leisure_flags[s + 1]));
            constraints
                .push(constraint!(adjacency[s] >= leisure_flags[s] + leisure_flags[s + 1] - 1.0));
        }
    }

    // Objective: weighted leisure minus context- and deadline-weighted
    // stress, plus the contiguity reward when active.
    let mut objective = Expression::from(0.0);
    for s in 0..total_slots {
        objective += weights.alpha * weights.leisure[s] * leisure[s];
    }
    for (i, task) in tasks.iter().enumerate() {
        let base_stress = (task.priority * task.difficulty) as f64;
        for s in 0..total_slots {
            let coeff = weights.beta
                * base_stress
                * weights.stress[s]
                * (1.0 + weights.gamma * lateness_factor(task, s));
            objective -= coeff * starts[i][s];
        }
    }
    for z in &adjacency {
        objective += weights.gamma_contiguity * *z;
    }

    debug!(
        target: "app::model",
        tasks = tasks.len(),
        total_slots,
        constraints = constraints.len(),
        variant = ?variant,
        "schedule model built"
    );

    ScheduleModel {
        variables: vars,
        objective,
        constraints,
        starts,
        leisure,
        leisure_flags,
        adjacency,
        variant,
    }
}
