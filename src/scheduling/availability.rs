//! Working-hours availability.
//!
//! Advisory only: a collaborator being on shift says nothing about
//! existing bookings, so callers still run the conflict detector.

use crate::shared::models::{Collaborator, DayOfWeek};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// Whether the collaborator's working hours fully cover the proposed
/// window. The window is decomposed per touched day; each day's
/// sub-window must fit inside one configured open/close interval.
/// A day without working-hours entries makes the whole window
/// unavailable.
pub fn is_collaborator_available(
    collaborator: &Collaborator,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> bool {
    if start_time >= end_time {
        return false;
    }

    let mut day = start_time.date_naive();
    let last_day = if end_time.time().num_seconds_from_midnight() == 0 {
        // An end exactly at midnight belongs to the previous day.
        end_time.date_naive().pred_opt().unwrap_or(end_time.date_naive())
    } else {
        end_time.date_naive()
    };

    while day <= last_day {
        let day_start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = day_start + Duration::days(1);

        let sub_start = start_time.max(day_start);
        let sub_end = end_time.min(day_end);

        let start_minutes = sub_start.time().num_seconds_from_midnight() / 60;
        let end_minutes = if sub_end == day_end {
            24 * 60
        } else {
            sub_end.time().num_seconds_from_midnight() / 60
        };

        let intervals = collaborator.schedule.intervals_for(DayOfWeek::from(day.weekday()));
        let covered = intervals
            .iter()
            .any(|interval| interval.contains_minutes(start_minutes, end_minutes));
        if !covered {
            return false;
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{WeeklySchedule, WorkInterval};
    use chrono::{NaiveTime, TimeZone};
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn weekday_collaborator() -> Collaborator {
        let mut schedule = WeeklySchedule::new();
        // Mon-Fri 09:00-18:00 with Wednesday split by lunch.
        for day in [
            DayOfWeek::Monday,
            DayOfWeek::Tuesday,
            DayOfWeek::Thursday,
            DayOfWeek::Friday,
        ] {
            schedule.set_day(day, vec![WorkInterval::new(t(9, 0), t(18, 0))]);
        }
        schedule.set_day(
            DayOfWeek::Wednesday,
            vec![
                WorkInterval::new(t(9, 0), t(12, 0)),
                WorkInterval::new(t(13, 0), t(18, 0)),
            ],
        );

        Collaborator {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Marina".to_string(),
            phone: None,
            schedule,
            created_at: Utc::now(),
        }
    }

    // 2024-01-08 is a Monday.
    fn on(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
    }

    #[test]
    fn test_window_inside_working_hours() {
        let collaborator = weekday_collaborator();
        assert!(is_collaborator_available(&collaborator, on(8, 10, 0), on(8, 11, 0)));
    }

    #[test]
    fn test_window_at_shift_edges() {
        let collaborator = weekday_collaborator();
        assert!(is_collaborator_available(&collaborator, on(8, 9, 0), on(8, 18, 0)));
        assert!(!is_collaborator_available(&collaborator, on(8, 8, 30), on(8, 9, 30)));
        assert!(!is_collaborator_available(&collaborator, on(8, 17, 30), on(8, 18, 30)));
    }

    #[test]
    fn test_day_without_schedule_is_unavailable() {
        let collaborator = weekday_collaborator();
        // 2024-01-13 is a Saturday.
        assert!(!is_collaborator_available(&collaborator, on(13, 10, 0), on(13, 11, 0)));
    }

    #[test]
    fn test_split_shift_rejects_lunch_crossing() {
        let collaborator = weekday_collaborator();
        // Wednesday 2024-01-10: lunch break 12:00-13:00.
        assert!(is_collaborator_available(&collaborator, on(10, 9, 0), on(10, 12, 0)));
        assert!(is_collaborator_available(&collaborator, on(10, 13, 0), on(10, 14, 0)));
        assert!(!is_collaborator_available(&collaborator, on(10, 11, 30), on(10, 13, 30)));
    }

    #[test]
    fn test_multi_day_window_checks_every_day() {
        let mut collaborator = weekday_collaborator();
        collaborator.schedule.set_day(
            DayOfWeek::Monday,
            vec![WorkInterval::new(t(0, 0), t(0, 0))],
        );
        collaborator.schedule.set_day(
            DayOfWeek::Tuesday,
            vec![WorkInterval::new(t(0, 0), t(0, 0))],
        );
        // Monday 22:00 through Tuesday 02:00, both days fully open.
        assert!(is_collaborator_available(&collaborator, on(8, 22, 0), on(9, 2, 0)));

        // Restore Tuesday to office hours: the overnight spill fails.
        collaborator.schedule.set_day(
            DayOfWeek::Tuesday,
            vec![WorkInterval::new(t(9, 0), t(18, 0))],
        );
        assert!(!is_collaborator_available(&collaborator, on(8, 22, 0), on(9, 2, 0)));
    }

    #[test]
    fn test_window_ending_at_midnight() {
        let mut collaborator = weekday_collaborator();
        collaborator.schedule.set_day(
            DayOfWeek::Monday,
            vec![WorkInterval::new(t(20, 0), t(0, 0))],
        );
        assert!(is_collaborator_available(&collaborator, on(8, 22, 0), on(9, 0, 0)));
    }

    #[test]
    fn test_inverted_window_is_unavailable() {
        let collaborator = weekday_collaborator();
        assert!(!is_collaborator_available(&collaborator, on(8, 11, 0), on(8, 10, 0)));
        assert!(!is_collaborator_available(&collaborator, on(8, 10, 0), on(8, 10, 0)));
    }
}
