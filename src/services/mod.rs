pub mod optimizer_service;
pub mod preference_map;
pub mod schedule_model;
pub mod schedule_solver;
pub mod schedule_utils;
pub mod slot_grid;
pub mod task_filter;
