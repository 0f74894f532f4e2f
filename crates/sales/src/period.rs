//! Calendar windows for revenue comparisons.
//!
//! All windows are computed in UTC and start at midnight.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::DomainError;

/// Midnight (UTC) of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    midnight(now.date_naive())
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Granularity of a revenue comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenuePeriod {
    Daily,
    Weekly,
    Monthly,
    Annual,
}

impl RevenuePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenuePeriod::Daily => "daily",
            RevenuePeriod::Weekly => "weekly",
            RevenuePeriod::Monthly => "monthly",
            RevenuePeriod::Annual => "annual",
        }
    }

    /// Start of the current and of the previous period relative to `now`.
    ///
    /// The current period is `[current_start, now]`, the previous one is
    /// `[previous_start, current_start)`.
    pub fn windows(&self, now: DateTime<Utc>) -> PeriodWindows {
        let today = now.date_naive();
        let (current, previous) = match self {
            RevenuePeriod::Daily => (today, today - Duration::days(1)),
            RevenuePeriod::Weekly => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (monday, monday - Duration::weeks(1))
            }
            RevenuePeriod::Monthly => {
                let first = first_of_month(today.year(), today.month()).unwrap_or(today);
                let last_of_previous = first - Duration::days(1);
                let previous = first_of_month(last_of_previous.year(), last_of_previous.month())
                    .unwrap_or(last_of_previous);
                (first, previous)
            }
            RevenuePeriod::Annual => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let previous = NaiveDate::from_ymd_opt(today.year() - 1, 1, 1).unwrap_or(first);
                (first, previous)
            }
        };

        PeriodWindows {
            current_start: midnight(current),
            previous_start: midnight(previous),
        }
    }
}

impl core::fmt::Display for RevenuePeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RevenuePeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RevenuePeriod::Daily),
            "weekly" => Ok(RevenuePeriod::Weekly),
            "monthly" => Ok(RevenuePeriod::Monthly),
            "annual" => Ok(RevenuePeriod::Annual),
            other => Err(DomainError::validation(format!(
                "unknown period '{other}' (expected daily, weekly, monthly or annual)"
            ))),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Start instants of a current/previous period pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindows {
    pub current_start: DateTime<Utc>,
    pub previous_start: DateTime<Utc>,
}
