//! Schedule parsing and next occurrence calculation.
//!
//! Supports standard 5-field cron expressions (minute, hour, day-of-month,
//! month, day-of-week) with `*`, ranges, steps, and lists, extended 6-field
//! cron (with a leading seconds field), and the usual shortcuts (`@daily`,
//! `@hourly`, ...). Parsing and occurrence calculation are side-effect free.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing or using schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Expression has the wrong number of fields.
    #[error("invalid cron expression {expression:?}: expected 5 or 6 fields, got {fields}")]
    FieldCount { expression: String, fields: usize },

    /// Expression failed to parse (out-of-range value, bad syntax).
    #[error("invalid cron expression: {0}")]
    InvalidExpression(String),

    /// Invalid timezone name.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The schedule has no occurrence after the given instant.
    #[error("no upcoming occurrence")]
    NoUpcomingOccurrence,
}

/// A validated, recurring time schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// The original expression string, as the user wrote it.
    expression: String,
    /// The timezone occurrences are evaluated in.
    timezone: Tz,
    /// The parsed schedule.
    inner: CronSchedule,
}

impl Schedule {
    /// Parse a cron expression, evaluating occurrences in UTC.
    pub fn parse(expression: impl Into<String>) -> Result<Self, ScheduleError> {
        Self::with_timezone(expression, "UTC")
    }

    /// Parse a cron expression with occurrences evaluated in a named timezone.
    pub fn with_timezone(
        expression: impl Into<String>,
        timezone: &str,
    ) -> Result<Self, ScheduleError> {
        let expression = expression.into();
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))?;

        let inner = Self::parse_inner(&expression)?;

        Ok(Self {
            expression,
            timezone: tz,
            inner,
        })
    }

    fn parse_inner(expression: &str) -> Result<CronSchedule, ScheduleError> {
        let trimmed = expression.trim();

        if let Some(expanded) = Self::expand_shortcut(trimmed) {
            return Self::parse_fields(expanded, trimmed);
        }

        Self::parse_fields(trimmed, trimmed)
    }

    /// Map `@daily`-style shortcuts to their canonical 5-field form.
    fn expand_shortcut(expression: &str) -> Option<&'static str> {
        match expression.to_lowercase().as_str() {
            "@yearly" | "@annually" => Some("0 0 1 1 *"),
            "@monthly" => Some("0 0 1 * *"),
            "@weekly" => Some("0 0 * * SUN"),
            "@daily" | "@midnight" => Some("0 0 * * *"),
            "@hourly" => Some("0 * * * *"),
            _ => None,
        }
    }

    /// Parse a 5- or 6-field expression. 5-field expressions get a `0`
    /// seconds field prepended; anything else is rejected up front.
    fn parse_fields(expression: &str, original: &str) -> Result<CronSchedule, ScheduleError> {
        let fields = expression.split_whitespace().count();

        let normalized = match fields {
            5 => format!("0 {}", expression),
            6 => expression.to_string(),
            _ => {
                return Err(ScheduleError::FieldCount {
                    expression: original.to_string(),
                    fields,
                });
            }
        };

        CronSchedule::from_str(&normalized)
            .map_err(|e| ScheduleError::InvalidExpression(e.to_string()))
    }

    /// Get the next occurrence strictly after the given instant, in UTC.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        let local = after.with_timezone(&self.timezone);
        self.inner
            .after(&local)
            .next()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(ScheduleError::NoUpcomingOccurrence)
    }

    /// Get the next occurrence from now.
    pub fn next(&self) -> Result<DateTime<Utc>, ScheduleError> {
        self.next_after(Utc::now())
    }

    /// Get up to the next `n` occurrences after the given instant.
    pub fn next_n_after(&self, after: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        let local = after.with_timezone(&self.timezone);
        self.inner
            .after(&local)
            .take(n)
            .map(|dt| dt.with_timezone(&Utc))
            .collect()
    }

    /// Get the original expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Get the timezone name.
    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }
}
