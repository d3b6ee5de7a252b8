//! Bidirectional translation between [`Schedule`] and trigger primitives.
//!
//! Forward translation is exact. Reverse translation inspects only the first
//! trigger and is deliberately lossy: a weekly trigger with repetition always
//! reads back as a restricted `Hourly`, whether it came from `Hourly` or
//! `DailyRecurring`. Downstream consumers rely on this collapse; do not
//! "fix" it.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};

use jobloop_types::{LAST_DAY, Restriction, Schedule};

use crate::trigger::{MINUTES_PER_DAY, Repetition, Trigger};

/// Translate a schedule to the ordered trigger list to register with the
/// host scheduler. An empty result means the schedule never fires (empty
/// weekly/monthly day sets); callers should surface that to the user.
pub fn to_triggers(schedule: &Schedule) -> Vec<Trigger> {
    match schedule {
        Schedule::Minute { interval } => vec![Trigger::Daily {
            start: today_at(NaiveTime::MIN),
            repetition: Some(Repetition {
                interval_minutes: *interval,
                duration_minutes: MINUTES_PER_DAY,
            }),
        }],

        Schedule::Hourly {
            interval,
            restriction,
        } => match restriction {
            Some(r) if !r.days.is_empty() => {
                let duration = r
                    .window_end
                    .map(|end| minutes_between(r.window_start, end))
                    .unwrap_or(MINUTES_PER_DAY);
                vec![Trigger::Weekly {
                    days: r.days.clone(),
                    start: today_at(r.window_start),
                    repetition: Some(Repetition {
                        interval_minutes: interval * 60,
                        duration_minutes: duration,
                    }),
                }]
            }
            _ => vec![Trigger::Daily {
                start: today_at(NaiveTime::MIN),
                repetition: Some(Repetition {
                    interval_minutes: interval * 60,
                    duration_minutes: MINUTES_PER_DAY,
                }),
            }],
        },

        Schedule::Daily { run_time } => vec![Trigger::Daily {
            start: today_at(*run_time),
            repetition: None,
        }],

        Schedule::DailyRecurring {
            interval,
            start_time,
            restriction,
        } => match restriction {
            Some(r) if !r.days.is_empty() => {
                // Window is measured from the recurrence start time, not the
                // restriction's own window start.
                let duration = r
                    .window_end
                    .map(|end| minutes_between(*start_time, end))
                    .unwrap_or(MINUTES_PER_DAY);
                vec![Trigger::Weekly {
                    days: r.days.clone(),
                    start: today_at(*start_time),
                    repetition: Some(Repetition {
                        interval_minutes: interval * 60,
                        duration_minutes: duration,
                    }),
                }]
            }
            _ => vec![Trigger::Daily {
                start: today_at(*start_time),
                repetition: Some(Repetition {
                    interval_minutes: interval * 60,
                    duration_minutes: MINUTES_PER_DAY,
                }),
            }],
        },

        Schedule::Weekly { days, run_time } => {
            if days.is_empty() {
                return Vec::new();
            }
            vec![Trigger::Weekly {
                days: days.clone(),
                start: today_at(*run_time),
                repetition: None,
            }]
        }

        Schedule::MonthlyDates { days, run_time } => {
            if days.is_empty() {
                return Vec::new();
            }
            let mut triggers = Vec::new();
            let regular: Vec<u8> = days.iter().copied().filter(|&d| (1..=31).contains(&d)).collect();
            if !regular.is_empty() {
                triggers.push(Trigger::MonthlyDays {
                    days: regular,
                    start: today_at(*run_time),
                });
            }
            if days.contains(&LAST_DAY) {
                triggers.push(Trigger::MonthlyLastWeek {
                    start: today_at(*run_time),
                });
            }
            triggers
        }
    }
}

/// Best-effort reverse translation. Only the first trigger is inspected;
/// jobs are expected to carry exactly one logical recurrence. No triggers
/// reads back as the default schedule.
pub fn from_triggers(triggers: &[Trigger]) -> Schedule {
    let Some(first) = triggers.first() else {
        return Schedule::default();
    };

    match first {
        Trigger::Daily {
            repetition: Some(rep),
            ..
        } => {
            if rep.interval_minutes < 60 {
                Schedule::Minute {
                    interval: rep.interval_minutes,
                }
            } else {
                Schedule::Hourly {
                    interval: rep.interval_minutes / 60,
                    restriction: None,
                }
            }
        }
        Trigger::Daily {
            start,
            repetition: None,
        } => Schedule::Daily {
            run_time: start.time(),
        },

        Trigger::Weekly {
            days,
            start,
            repetition: Some(rep),
        } => Schedule::Hourly {
            interval: rep.interval_minutes / 60,
            restriction: Some(Restriction {
                days: days.clone(),
                window_start: start.time(),
                // A full-day duration means "no window end" was requested
                window_end: if rep.duration_minutes == MINUTES_PER_DAY {
                    None
                } else {
                    Some(start.time() + Duration::minutes(rep.duration_minutes as i64))
                },
            }),
        },
        Trigger::Weekly {
            days,
            start,
            repetition: None,
        } => Schedule::Weekly {
            days: days.clone(),
            run_time: start.time(),
        },

        Trigger::MonthlyDays { days, start } => Schedule::MonthlyDates {
            days: days.clone(),
            run_time: start.time(),
        },
        Trigger::MonthlyLastWeek { start } => Schedule::MonthlyDates {
            days: vec![LAST_DAY],
            run_time: start.time(),
        },
    }
}

fn today_at(time: NaiveTime) -> NaiveDateTime {
    Local::now().date_naive().and_time(time)
}

fn minutes_between(from: NaiveTime, to: NaiveTime) -> u32 {
    (to - from).num_minutes().max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobloop_types::Weekday;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_minute_emits_repeating_daily() {
        let triggers = to_triggers(&Schedule::Minute { interval: 15 });
        assert_eq!(triggers.len(), 1);
        match &triggers[0] {
            Trigger::Daily { start, repetition } => {
                assert_eq!(start.time(), NaiveTime::MIN);
                let rep = repetition.unwrap();
                assert_eq!(rep.interval_minutes, 15);
                assert_eq!(rep.duration_minutes, MINUTES_PER_DAY);
            }
            other => panic!("expected daily trigger, got {other:?}"),
        }
    }

    #[test]
    fn test_restricted_hourly_emits_weekly() {
        let schedule = Schedule::Hourly {
            interval: 2,
            restriction: Some(Restriction {
                days: vec![Weekday::Monday, Weekday::Wednesday],
                window_start: at(8, 0),
                window_end: Some(at(18, 0)),
            }),
        };
        let triggers = to_triggers(&schedule);
        match &triggers[0] {
            Trigger::Weekly {
                days,
                start,
                repetition,
            } => {
                assert_eq!(days.len(), 2);
                assert_eq!(start.time(), at(8, 0));
                let rep = repetition.unwrap();
                assert_eq!(rep.interval_minutes, 120);
                assert_eq!(rep.duration_minutes, 600);
            }
            other => panic!("expected weekly trigger, got {other:?}"),
        }
    }

    #[test]
    fn test_restriction_with_empty_days_falls_back_to_daily() {
        let schedule = Schedule::Hourly {
            interval: 3,
            restriction: Some(Restriction {
                days: vec![],
                window_start: at(8, 0),
                window_end: None,
            }),
        };
        let triggers = to_triggers(&schedule);
        assert!(matches!(triggers[0], Trigger::Daily { .. }));
    }

    #[test]
    fn test_weekly_empty_days_is_no_op() {
        let schedule = Schedule::Weekly {
            days: vec![],
            run_time: at(9, 0),
        };
        assert!(to_triggers(&schedule).is_empty());
    }

    #[test]
    fn test_monthly_empty_days_is_no_op() {
        let schedule = Schedule::MonthlyDates {
            days: vec![],
            run_time: at(9, 0),
        };
        assert!(to_triggers(&schedule).is_empty());
    }

    #[test]
    fn test_monthly_with_last_emits_two_triggers() {
        let schedule = Schedule::MonthlyDates {
            days: vec![1, 15, LAST_DAY],
            run_time: at(23, 59),
        };
        let triggers = to_triggers(&schedule);
        assert_eq!(triggers.len(), 2);
        match &triggers[0] {
            Trigger::MonthlyDays { days, .. } => assert_eq!(days, &vec![1, 15]),
            other => panic!("expected monthly-days trigger, got {other:?}"),
        }
        assert!(matches!(triggers[1], Trigger::MonthlyLastWeek { .. }));
    }

    #[test]
    fn test_monthly_only_last() {
        let schedule = Schedule::MonthlyDates {
            days: vec![LAST_DAY],
            run_time: at(6, 0),
        };
        let triggers = to_triggers(&schedule);
        assert_eq!(triggers.len(), 1);
        assert!(matches!(triggers[0], Trigger::MonthlyLastWeek { .. }));
    }

    #[test]
    fn test_reverse_classifies_minute_vs_hourly() {
        let minute = from_triggers(&to_triggers(&Schedule::Minute { interval: 30 }));
        assert_eq!(minute, Schedule::Minute { interval: 30 });

        let hourly = from_triggers(&to_triggers(&Schedule::Hourly {
            interval: 4,
            restriction: None,
        }));
        assert_eq!(
            hourly,
            Schedule::Hourly {
                interval: 4,
                restriction: None
            }
        );
    }

    #[test]
    fn test_reverse_of_empty_is_default() {
        assert_eq!(from_triggers(&[]), Schedule::default());
    }

    #[test]
    fn test_daily_recurring_with_restriction_collapses_to_hourly() {
        // The documented lossy mapping: restricted DailyRecurring reads back
        // as restricted Hourly with the same trigger shape.
        let schedule = Schedule::DailyRecurring {
            interval: 2,
            start_time: at(7, 0),
            restriction: Some(Restriction {
                days: vec![Weekday::Tuesday],
                window_start: at(7, 0),
                window_end: Some(at(19, 0)),
            }),
        };
        let parsed = from_triggers(&to_triggers(&schedule));
        match parsed {
            Schedule::Hourly {
                interval,
                restriction: Some(r),
            } => {
                assert_eq!(interval, 2);
                assert_eq!(r.days, vec![Weekday::Tuesday]);
                assert_eq!(r.window_start, at(7, 0));
                assert_eq!(r.window_end, Some(at(19, 0)));
            }
            other => panic!("expected restricted hourly, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_stability_for_all_variants() {
        // Reverse translation is lossy, but a reverse-translated schedule is
        // a fixed point: translating it forward, back, and forward again
        // yields the same triggers.
        let schedules = [
            Schedule::Minute { interval: 5 },
            Schedule::Hourly {
                interval: 2,
                restriction: Some(Restriction {
                    days: vec![Weekday::Monday, Weekday::Friday],
                    window_start: at(8, 0),
                    window_end: Some(at(18, 0)),
                }),
            },
            Schedule::Daily { run_time: at(14, 30) },
            Schedule::DailyRecurring {
                interval: 3,
                start_time: at(6, 0),
                restriction: None,
            },
            Schedule::Weekly {
                days: vec![Weekday::Sunday, Weekday::Saturday],
                run_time: at(10, 0),
            },
            Schedule::MonthlyDates {
                days: vec![1, 15, LAST_DAY],
                run_time: at(23, 59),
            },
        ];
        for schedule in schedules {
            let normalized = from_triggers(&to_triggers(&schedule));
            let once = to_triggers(&normalized);
            let again = to_triggers(&from_triggers(&once));
            assert_eq!(again, once, "unstable round trip for {schedule:?}");
        }
    }
}
