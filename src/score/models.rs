use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named scoring window.
///
/// `Global` is unbounded; `Weekly` windows are fixed 7-day, UTC-aligned ISO
/// weeks carried as `weekly:<year>-W<week>`. Periods have independent
/// namespaces and independent retention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Period {
    Global,
    Weekly(String),
}

#[derive(Debug, Error)]
#[error("unrecognized period: {0}")]
pub struct PeriodParseError(String);

impl Period {
    /// The weekly window containing `now`.
    pub fn weekly_for(now: DateTime<Utc>) -> Self {
        let week = now.iso_week();
        Period::Weekly(format!("{}-W{:02}", week.year(), week.week()))
    }

    /// Monday 00:00 UTC of the weekly window; `None` for `Global` or an
    /// unparseable window id.
    pub fn window_start(&self) -> Option<DateTime<Utc>> {
        match self {
            Period::Global => None,
            Period::Weekly(id) => {
                let (year, week) = id.split_once("-W")?;
                let year: i32 = year.parse().ok()?;
                let week: u32 = week.parse().ok()?;
                let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
                Some(Utc.from_utc_datetime(&monday.and_hms_opt(0, 0, 0)?))
            }
        }
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self, Period::Weekly(_))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Global => write!(f, "global"),
            Period::Weekly(id) => write!(f, "weekly:{}", id),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(Period::Global);
        }
        match s.strip_prefix("weekly:") {
            Some(id) if !id.is_empty() => Ok(Period::Weekly(id.to_string())),
            _ => Err(PeriodParseError(s.to_string())),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Result of an atomic conditional raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaiseOutcome {
    pub applied: bool,
    pub previous_score: Option<u32>,
}

/// One row of a ranked read. Ranks are 1-indexed, descending by score with
/// ties broken by user_id ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub user_id: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn period_round_trips_through_strings() {
        let weekly: Period = "weekly:2026-W32".parse().unwrap();
        assert_eq!(weekly, Period::Weekly("2026-W32".to_string()));
        assert_eq!(weekly.to_string(), "weekly:2026-W32");

        let global: Period = "global".parse().unwrap();
        assert_eq!(global, Period::Global);
        assert_eq!(global.to_string(), "global");

        assert!("weekly:".parse::<Period>().is_err());
        assert!("monthly:2026-01".parse::<Period>().is_err());
    }

    #[test]
    fn weekly_for_uses_iso_week() {
        // 2026-08-06 is a Thursday in ISO week 32.
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 9, 30, 0).unwrap();
        let period = Period::weekly_for(now);
        assert_eq!(period, Period::Weekly("2026-W32".to_string()));

        let start = period.window_start().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap());
        assert!(start <= now);
    }

    #[test]
    fn global_has_no_window_start() {
        assert_eq!(Period::Global.window_start(), None);
    }
}
