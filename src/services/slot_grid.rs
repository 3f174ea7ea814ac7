use chrono::{Duration, Local, NaiveDateTime, Timelike};
use tracing::debug;

use crate::error::{AppError, AppResult};

pub const TOTAL_DAYS: usize = 7;
pub const SLOT_MINUTES: i64 = 15;
const SLOTS_PER_HOUR: usize = 4;

/// Discrete 15-minute slot grid over seven consecutive days, each restricted
/// to the daily window `[start_hour:00, end_hour:00)` in naive local time.
/// The day-0 midnight anchor is captured in the value, so independent grids
/// can coexist and tests can pin the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    start_hour: u32,
    end_hour: u32,
    slots_per_day: usize,
    total_slots: usize,
    day0_midnight: NaiveDateTime,
}

impl SlotGrid {
    pub fn new(start_hour: u32, end_hour: u32, day0_midnight: NaiveDateTime) -> AppResult<Self> {
        if start_hour > 23 || end_hour == 0 || end_hour > 24 || start_hour >= end_hour {
            return Err(AppError::configuration(format!(
                "无效的起止小时: {start_hour}-{end_hour} (要求 0 <= start < end <= 24)"
            )));
        }
        let slots_per_day = (end_hour - start_hour) as usize * SLOTS_PER_HOUR;
        let total_slots = slots_per_day * TOTAL_DAYS;
        if total_slots == 0 {
            return Err(AppError::configuration(format!(
                "时间窗口 {start_hour}:00 - {end_hour}:00 不包含任何可排程槽位"
            )));
        }
        debug!(
            target: "app::grid",
            start_hour,
            end_hour,
            slots_per_day,
            total_slots,
            "slot grid created"
        );
        Ok(SlotGrid {
            start_hour,
            end_hour,
            slots_per_day,
            total_slots,
            day0_midnight,
        })
    }

    pub fn for_today(start_hour: u32, end_hour: u32) -> AppResult<Self> {
        let midnight = Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time");
        SlotGrid::new(start_hour, end_hour, midnight)
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn slots_per_day(&self) -> usize {
        self.slots_per_day
    }

    pub fn total_slots(&self) -> usize {
        self.total_slots
    }

    pub fn day0_midnight(&self) -> NaiveDateTime {
        self.day0_midnight
    }

    /// First scheduled instant of the horizon (day 0 at `start_hour`).
    pub fn day0_start(&self) -> NaiveDateTime {
        self.day0_midnight + Duration::hours(self.start_hour as i64)
    }

    pub fn horizon_end(&self) -> NaiveDateTime {
        self.day0_midnight + Duration::days(TOTAL_DAYS as i64)
    }

    pub fn day_of_slot(&self, slot: usize) -> usize {
        slot / self.slots_per_day
    }

    /// Wall-clock hour at which `slot` starts. Valid for `slot < total_slots`.
    pub fn slot_hour(&self, slot: usize) -> u32 {
        self.start_hour + ((slot % self.slots_per_day) / SLOTS_PER_HOUR) as u32
    }

    pub fn day_window_end(&self, slot: usize) -> NaiveDateTime {
        self.day0_midnight
            + Duration::days(self.day_of_slot(slot) as i64)
            + Duration::hours(self.end_hour as i64)
    }

    /// Local start time of `slot`. The sentinel `slot == total_slots` yields
    /// the exclusive end of the horizon (day 7 at `start_hour`); anything
    /// larger is out of range.
    pub fn slot_to_datetime(&self, slot: usize) -> AppResult<NaiveDateTime> {
        if slot > self.total_slots {
            return Err(AppError::out_of_range(slot, self.total_slots));
        }
        if slot == self.total_slots {
            return Ok(self.day0_start() + Duration::days(TOTAL_DAYS as i64));
        }
        let day_index = slot / self.slots_per_day;
        let slot_in_day = slot % self.slots_per_day;
        Ok(self.day0_start()
            + Duration::days(day_index as i64)
            + Duration::minutes(slot_in_day as i64 * SLOT_MINUTES))
    }

    /// Index of the slot containing `dt`, clamped to the horizon and the
    /// daily window: instants before day-0 midnight map to slot 0, instants
    /// at or past the end of day 6 map to the last slot, and within a day
    /// anything before `start_hour` maps to the first slot of that day while
    /// anything at or after `end_hour` maps to its last slot.
    pub fn datetime_to_slot(&self, dt: NaiveDateTime) -> usize {
        if dt < self.day0_midnight {
            return 0;
        }
        if dt >= self.horizon_end() {
            return self.total_slots - 1;
        }

        let elapsed_days = (dt - self.day0_midnight).num_days();
        let day_index = elapsed_days.clamp(0, TOTAL_DAYS as i64 - 1) as usize;

        let minutes_into_day = (dt.hour() * 60 + dt.minute()) as i64;
        let window_start = self.start_hour as i64 * 60;
        let window_end = self.end_hour as i64 * 60;

        let slot_in_day = if minutes_into_day < window_start {
            0
        } else if minutes_into_day >= window_end {
            self.slots_per_day - 1
        } else {
            ((minutes_into_day - window_start) / SLOT_MINUTES) as usize
        };
        let slot_in_day = slot_in_day.min(self.slots_per_day - 1);

        (day_index * self.slots_per_day + slot_in_day).min(self.total_slots - 1)
    }
}
