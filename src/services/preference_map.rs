use std::collections::HashSet;

use crate::models::task::Preference;
use crate::services::slot_grid::SlotGrid;

const MORNING_HOURS: std::ops::Range<u32> = 8..12;
const AFTERNOON_HOURS: std::ops::Range<u32> = 12..16;
const EVENING_HOURS: std::ops::Range<u32> = 16..22;

/// Precomputed partition of the slot space into the named time-of-day
/// regions. Regions are derived from each slot's actual start hour, so a
/// narrow daily window can leave some of them empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceMap {
    morning: HashSet<usize>,
    afternoon: HashSet<usize>,
    evening: HashSet<usize>,
    total_slots: usize,
}

impl PreferenceMap {
    pub fn build(grid: &SlotGrid) -> Self {
        let mut morning = HashSet::new();
        let mut afternoon = HashSet::new();
        let mut evening = HashSet::new();
        for slot in 0..grid.total_slots() {
            let hour = grid.slot_hour(slot);
            if MORNING_HOURS.contains(&hour) {
                morning.insert(slot);
            }
            if AFTERNOON_HOURS.contains(&hour) {
                afternoon.insert(slot);
            }
            if EVENING_HOURS.contains(&hour) {
                evening.insert(slot);
            }
        }
        PreferenceMap {
            morning,
            afternoon,
            evening,
            total_slots: grid.total_slots(),
        }
    }

    /// Whether `slot` is an admissible start for the given preference.
    pub fn allows(&self, preference: Preference, slot: usize) -> bool {
        match preference {
            Preference::Any => slot < self.total_slots,
            Preference::Morning => self.morning.contains(&slot),
            Preference::Afternoon => self.afternoon.contains(&slot),
            Preference::Evening => self.evening.contains(&slot),
        }
    }

    pub fn region_len(&self, preference: Preference) -> usize {
        match preference {
            Preference::Any => self.total_slots,
            Preference::Morning => self.morning.len(),
            Preference::Afternoon => self.afternoon.len(),
            Preference::Evening => self.evening.len(),
        }
    }
}
