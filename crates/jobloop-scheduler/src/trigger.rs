//! Host-scheduler trigger primitives.
//!
//! These mirror what a native scheduler engine understands: a start boundary
//! plus, for repeating kinds, an interval and a duration bound. Minute-level
//! resolution is all the recurrence model needs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use jobloop_types::Weekday;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Repetition attached to a trigger: re-fire every `interval_minutes` for
/// `duration_minutes` after the start boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repetition {
    pub interval_minutes: u32,
    pub duration_minutes: u32,
}

/// A single scheduler-native trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires every day at the start boundary's time of day.
    Daily {
        start: NaiveDateTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repetition: Option<Repetition>,
    },
    /// Fires on the given weekdays.
    Weekly {
        days: Vec<Weekday>,
        start: NaiveDateTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repetition: Option<Repetition>,
    },
    /// Fires on specific days of every month.
    MonthlyDays { days: Vec<u8>, start: NaiveDateTime },
    /// Fires in the last week of every month, any weekday — the host-side
    /// expression of "last day of the month".
    MonthlyLastWeek { start: NaiveDateTime },
}

impl Trigger {
    pub fn start(&self) -> NaiveDateTime {
        match self {
            Trigger::Daily { start, .. }
            | Trigger::Weekly { start, .. }
            | Trigger::MonthlyDays { start, .. }
            | Trigger::MonthlyLastWeek { start } => *start,
        }
    }
}
