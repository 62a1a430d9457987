//! Run schedule.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{AppError, AppResult};

/// Cron schedule in `sec min hour day-of-month month day-of-week` form, evaluated in UTC.
#[derive(Debug, Clone)]
pub struct RunSchedule {
    expression: String,
    schedule: Schedule,
}

impl RunSchedule {
    pub fn parse(expression: &str) -> AppResult<Self> {
        let expression = expression.trim();
        let fields = expression.split_whitespace().count();
        if fields != 6 {
            return Err(AppError::Schedule(format!(
                "{expression:?}: expected 6 fields, found {fields}"
            )));
        }
        let schedule = Schedule::from_str(expression)
            .map_err(|e| AppError::Schedule(format!("{expression:?}: {e}")))?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_schedule() {
        let schedule = RunSchedule::parse("0 0 9 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 30, 0).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Some(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap())
        );

        let later = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(later),
            Some(Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_weekly_schedule() {
        // 2026-03-14 is a Saturday.
        let schedule = RunSchedule::parse("0 30 12 * * Mon").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(now),
            Some(Utc.with_ymd_and_hms(2026, 3, 16, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!(matches!(
            RunSchedule::parse("0 9 * * *"),
            Err(AppError::Schedule(_))
        ));
        assert!(matches!(
            RunSchedule::parse("0 0 9 * * * 2030"),
            Err(AppError::Schedule(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(RunSchedule::parse("a b c d e f").is_err());
        assert!(RunSchedule::parse("").is_err());
    }
}
