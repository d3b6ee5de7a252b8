//! Recurrence model: when a job runs.
//!
//! Six fixed shapes, no cron expressions. The scheduler crate translates these
//! to and from host trigger primitives; here they are pure data.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel month-day meaning "last day of the month".
pub const LAST_DAY: u8 = 32;

/// Day of the week, Sunday-first like the scheduler backends count them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Three-letter abbreviation used in schedule descriptions.
    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }
}

/// Narrows a recurring schedule to certain weekdays and a daily time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub days: Vec<Weekday>,
    pub window_start: NaiveTime,
    /// End of the daily window; the repetition runs the full 24h when None.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<NaiveTime>,
}

/// The six supported recurrence shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Every `interval` minutes, all day.
    Minute { interval: u32 },
    /// Every `interval` hours, optionally restricted to weekdays/window.
    Hourly {
        interval: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restriction: Option<Restriction>,
    },
    /// Once a day at a fixed time.
    Daily { run_time: NaiveTime },
    /// Every `interval` hours starting from a fixed time of day.
    DailyRecurring {
        interval: u32,
        start_time: NaiveTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restriction: Option<Restriction>,
    },
    /// On the given weekdays at a fixed time. An empty day set never fires.
    Weekly {
        days: Vec<Weekday>,
        run_time: NaiveTime,
    },
    /// On the given month days (1-31, [`LAST_DAY`] for the last day) at a
    /// fixed time. An empty date set never fires.
    MonthlyDates { days: Vec<u8>, run_time: NaiveTime },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Daily {
            run_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("interval must be at least 1, got {0}")]
    ZeroInterval(u32),
    #[error("month day {0} is out of range (1-31, 32 for last)")]
    BadMonthDay(u8),
}

impl Schedule {
    /// Check structural invariants. Empty day sets are legal; they degrade to
    /// a schedule that never fires, which callers surface in the description.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            Schedule::Minute { interval }
            | Schedule::Hourly { interval, .. }
            | Schedule::DailyRecurring { interval, .. } => {
                if *interval < 1 {
                    return Err(ScheduleError::ZeroInterval(*interval));
                }
            }
            Schedule::MonthlyDates { days, .. } => {
                if let Some(&bad) = days.iter().find(|&&d| d < 1 || d > LAST_DAY) {
                    return Err(ScheduleError::BadMonthDay(bad));
                }
            }
            Schedule::Daily { .. } | Schedule::Weekly { .. } => {}
        }
        Ok(())
    }

    /// Human-readable one-line summary, e.g. `"Daily at 14:30"`.
    pub fn describe(&self) -> String {
        match self {
            Schedule::Minute { interval } => format!("Every {interval} minute(s)"),
            Schedule::Hourly {
                interval,
                restriction,
            } => match restriction {
                Some(r) if r.window_end.is_some() => format!(
                    "Every {interval} hour(s) from {} to {}",
                    fmt_time(r.window_start),
                    fmt_time(r.window_end.unwrap()),
                ),
                _ => format!("Every {interval} hour(s)"),
            },
            Schedule::Daily { run_time } => format!("Daily at {}", fmt_time(*run_time)),
            Schedule::DailyRecurring {
                interval,
                start_time,
                ..
            } => format!(
                "Every {interval} hour(s) starting at {}",
                fmt_time(*start_time)
            ),
            Schedule::Weekly { days, run_time } => {
                if days.is_empty() {
                    format!("Weekly (No days selected) at {}", fmt_time(*run_time))
                } else {
                    let names: Vec<&str> = days.iter().map(|d| d.short_name()).collect();
                    format!("Weekly on {} at {}", names.join(", "), fmt_time(*run_time))
                }
            }
            Schedule::MonthlyDates { days, run_time } => {
                if days.is_empty() {
                    format!("Monthly (No days selected) at {}", fmt_time(*run_time))
                } else {
                    let names: Vec<String> = days
                        .iter()
                        .map(|&d| {
                            if d == LAST_DAY {
                                "Last".to_string()
                            } else {
                                d.to_string()
                            }
                        })
                        .collect();
                    format!(
                        "Monthly on day(s) {} at {}",
                        names.join(", "),
                        fmt_time(*run_time)
                    )
                }
            }
        }
    }
}

fn fmt_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_describe_minute() {
        let s = Schedule::Minute { interval: 15 };
        assert_eq!(s.describe(), "Every 15 minute(s)");
    }

    #[test]
    fn test_describe_daily() {
        let s = Schedule::Daily { run_time: at(14, 30) };
        assert_eq!(s.describe(), "Daily at 14:30");
    }

    #[test]
    fn test_describe_weekly() {
        let s = Schedule::Weekly {
            days: vec![Weekday::Monday, Weekday::Wednesday],
            run_time: at(9, 0),
        };
        assert_eq!(s.describe(), "Weekly on Mon, Wed at 09:00");
    }

    #[test]
    fn test_describe_weekly_no_days() {
        let s = Schedule::Weekly {
            days: vec![],
            run_time: at(9, 0),
        };
        assert_eq!(s.describe(), "Weekly (No days selected) at 09:00");
    }

    #[test]
    fn test_describe_hourly_with_window() {
        let s = Schedule::Hourly {
            interval: 2,
            restriction: Some(Restriction {
                days: vec![Weekday::Monday],
                window_start: at(8, 0),
                window_end: Some(at(18, 0)),
            }),
        };
        assert_eq!(s.describe(), "Every 2 hour(s) from 08:00 to 18:00");
    }

    #[test]
    fn test_describe_hourly_plain() {
        let s = Schedule::Hourly {
            interval: 3,
            restriction: None,
        };
        assert_eq!(s.describe(), "Every 3 hour(s)");
    }

    #[test]
    fn test_describe_monthly_with_last() {
        let s = Schedule::MonthlyDates {
            days: vec![1, 15, LAST_DAY],
            run_time: at(23, 59),
        };
        assert_eq!(s.describe(), "Monthly on day(s) 1, 15, Last at 23:59");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let s = Schedule::Minute { interval: 0 };
        assert!(s.validate().is_err());
        let s = Schedule::Hourly {
            interval: 0,
            restriction: None,
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_month_day() {
        let s = Schedule::MonthlyDates {
            days: vec![1, 40],
            run_time: at(9, 0),
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_empty_day_sets() {
        let s = Schedule::Weekly {
            days: vec![],
            run_time: at(9, 0),
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_schedule_serde_round_trip() {
        let s = Schedule::DailyRecurring {
            interval: 4,
            start_time: at(6, 0),
            restriction: Some(Restriction {
                days: vec![Weekday::Friday],
                window_start: at(6, 0),
                window_end: None,
            }),
        };
        let json = serde_json::to_string(&s).unwrap();
        let parsed: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }
}
