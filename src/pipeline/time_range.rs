//! Resolution of the dashboard's time-range selector into query bounds.
//!
//! The selector is in one of three states: a symbolic window ("Last hour",
//! "All time", ...), a custom date/time range, or a measurement session.
//! [`resolve_at`] is the only place that interprets all three; it is pure
//! and takes the current time as an argument.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Separator between the two halves of a measurement session string.
pub const SESSION_SEPARATOR: &str = " to ";

/// Earliest instant the warehouse can store (`DATETIME` minimum).
pub const MIN_TIMESTAMP: NaiveDateTime = match NaiveDate::from_ymd_opt(1, 1, 1) {
    Some(date) => match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => midnight,
        None => NaiveDateTime::MIN,
    },
    None => NaiveDateTime::MIN,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TimeRangeSelection {
    #[serde(rename = "Last minute")]
    LastMinute,
    #[serde(rename = "Last hour")]
    LastHour,
    #[serde(rename = "Last day")]
    #[default]
    LastDay,
    #[serde(rename = "Last week")]
    LastWeek,
    #[serde(rename = "Last month")]
    LastMonth,
    #[serde(rename = "Last year")]
    LastYear,
    #[serde(rename = "All time")]
    AllTime,
    #[serde(rename = "Custom")]
    Custom,
    #[serde(rename = "Measurement session")]
    MeasurementSession,
}

impl TimeRangeSelection {
    pub const ALL: [Self; 9] = [
        Self::LastMinute,
        Self::LastHour,
        Self::LastDay,
        Self::LastWeek,
        Self::LastMonth,
        Self::LastYear,
        Self::AllTime,
        Self::Custom,
        Self::MeasurementSession,
    ];

    /// Dropdown label, also used on the wire.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LastMinute => "Last minute",
            Self::LastHour => "Last hour",
            Self::LastDay => "Last day",
            Self::LastWeek => "Last week",
            Self::LastMonth => "Last month",
            Self::LastYear => "Last year",
            Self::AllTime => "All time",
            Self::Custom => "Custom",
            Self::MeasurementSession => "Measurement session",
        }
    }

    /// Fixed look-back for symbolic windows; `None` for the other selections.
    #[must_use]
    pub fn duration(self) -> Option<Duration> {
        match self {
            Self::LastMinute => Some(Duration::minutes(1)),
            Self::LastHour => Some(Duration::hours(1)),
            Self::LastDay => Some(Duration::days(1)),
            Self::LastWeek => Some(Duration::weeks(1)),
            Self::LastMonth => Some(Duration::days(31)),
            Self::LastYear => Some(Duration::days(365)),
            Self::AllTime | Self::Custom | Self::MeasurementSession => None,
        }
    }

    /// Whether the custom date/time inputs are active in this state.
    #[must_use]
    pub fn enables_custom_inputs(self) -> bool {
        self == Self::Custom
    }

    /// Whether the measurement-session input is active in this state.
    #[must_use]
    pub fn enables_session_input(self) -> bool {
        self == Self::MeasurementSession
    }
}

impl fmt::Display for TimeRangeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeRangeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|selection| selection.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown time range '{s}'"))
    }
}

/// Concrete query bounds. `start <= finish` except for verbatim custom ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
}

impl TimeWindow {
    #[must_use]
    pub fn new(start: NaiveDateTime, finish: NaiveDateTime) -> Self {
        Self { start, finish }
    }

    /// True when no instant can satisfy `start <= t <= finish`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.finish
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.finish - self.start
    }
}

/// One side of a custom range, as entered in the date picker and time fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTimeParts {
    pub date: Option<String>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl DateTimeParts {
    fn is_complete(&self) -> bool {
        self.date.is_some() && self.hour.is_some() && self.minute.is_some() && self.second.is_some()
    }

    /// Combine the parts into a timestamp; `Ok(None)` while any part is missing.
    ///
    /// # Errors
    ///
    /// Returns a description of the offending value when the date or time is invalid.
    pub fn combine(&self) -> Result<Option<NaiveDateTime>, String> {
        let (Some(date), Some(hour), Some(minute), Some(second)) =
            (&self.date, self.hour, self.minute, self.second)
        else {
            return Ok(None);
        };

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{date}': {e}"))?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| format!("invalid time {hour:02}:{minute:02}:{second:02}"))?;

        Ok(Some(date.and_time(time)))
    }
}

/// The custom start and end inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomBounds {
    pub start: DateTimeParts,
    pub end: DateTimeParts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomBoundsStatus {
    Complete(TimeWindow),
    Incomplete,
    Invalid(String),
}

impl CustomBounds {
    /// Check that every sub-field is present and combine them.
    #[must_use]
    pub fn validate(&self) -> CustomBoundsStatus {
        if !(self.start.is_complete() && self.end.is_complete()) {
            return CustomBoundsStatus::Incomplete;
        }

        match (self.start.combine(), self.end.combine()) {
            (Ok(Some(start)), Ok(Some(finish))) => {
                CustomBoundsStatus::Complete(TimeWindow::new(start, finish))
            }
            (Err(reason), _) | (_, Err(reason)) => CustomBoundsStatus::Invalid(reason),
            _ => CustomBoundsStatus::Incomplete,
        }
    }
}

/// A contiguous interval of recorded data, rendered as `"<start> to <finish>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct MeasurementSession {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
}

impl MeasurementSession {
    /// Parse `"<iso start> to <iso finish>"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (start, finish) = value.split_once(SESSION_SEPARATOR)?;
        Some(Self {
            start: parse_iso_datetime(start)?,
            finish: parse_iso_datetime(finish)?,
        })
    }

    #[must_use]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.finish)
    }
}

impl fmt::Display for MeasurementSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SESSION_SEPARATOR}{}",
            format_iso_datetime(&self.start),
            format_iso_datetime(&self.finish)
        )
    }
}

/// ISO-8601 rendering without a zone; fractional seconds only when present.
#[must_use]
pub fn format_iso_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Parse an ISO-8601 date or date-time.
///
/// Accepts `T` or space separators, optional fractional seconds and an optional
/// UTC offset (converted to UTC). A bare date means midnight.
#[must_use]
pub fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Resolve a selection against the current UTC wall time.
#[must_use]
pub fn resolve(
    selection: TimeRangeSelection,
    custom: &CustomBounds,
    measurement_session: Option<&str>,
) -> Option<TimeWindow> {
    resolve_at(selection, custom, measurement_session, Utc::now().naive_utc())
}

/// Resolve a selection into `[start, finish]` bounds, given `now`.
///
/// Returns `None` when the selection cannot be resolved: incomplete or invalid
/// custom inputs, or a missing or malformed measurement session.
#[must_use]
pub fn resolve_at(
    selection: TimeRangeSelection,
    custom: &CustomBounds,
    measurement_session: Option<&str>,
    now: NaiveDateTime,
) -> Option<TimeWindow> {
    match selection {
        TimeRangeSelection::AllTime => Some(TimeWindow::new(MIN_TIMESTAMP, now)),
        TimeRangeSelection::Custom => match custom.validate() {
            CustomBoundsStatus::Complete(window) => Some(window),
            CustomBoundsStatus::Incomplete | CustomBoundsStatus::Invalid(_) => None,
        },
        TimeRangeSelection::MeasurementSession => {
            measurement_session.and_then(MeasurementSession::parse).map(|s| s.window())
        }
        symbolic => {
            let duration = symbolic.duration()?;
            Some(TimeWindow::new(now - duration, now))
        }
    }
}
