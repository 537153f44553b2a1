//! Domain model for schedule records and submission outcomes

use crate::error::{PunchError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minute-resolution wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(PunchError::InvalidTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    /// Minutes since midnight
    pub fn minutes(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    /// Clamp to a ceiling, returning the ceiling for any later time
    pub fn clamped_to(self, ceiling: TimeOfDay) -> TimeOfDay {
        if self > ceiling { ceiling } else { self }
    }
}

impl FromStr for TimeOfDay {
    type Err = PunchError;

    fn from_str(s: &str) -> Result<Self> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| PunchError::InvalidTime(s.to_string()))?;
        let hour: u8 = h
            .trim()
            .parse()
            .map_err(|_| PunchError::InvalidTime(s.to_string()))?;
        let minute: u8 = m
            .trim()
            .parse()
            .map_err(|_| PunchError::InvalidTime(s.to_string()))?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Remote/commute classification the target form requires for every day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    Remote,
    CommuteRoundTrip,
    CommuteOneWay,
    CommuteNone,
    Other,
}

impl LocationType {
    /// The `<option value>` the target application's selector uses.
    /// These are opaque identifiers observed in the deployed form.
    pub fn form_value(&self) -> &'static str {
        match self {
            LocationType::Remote => "2",
            LocationType::CommuteRoundTrip => "5",
            LocationType::CommuteOneWay => "6",
            LocationType::CommuteNone => "7",
            LocationType::Other => "4",
        }
    }

    /// Label used in the schedule CSV
    pub fn label(&self) -> &'static str {
        match self {
            LocationType::Remote => "remote",
            LocationType::CommuteRoundTrip => "commute_round_trip",
            LocationType::CommuteOneWay => "commute_one_way",
            LocationType::CommuteNone => "commute_none",
            LocationType::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "remote" => Some(LocationType::Remote),
            "commute_round_trip" => Some(LocationType::CommuteRoundTrip),
            "commute_one_way" => Some(LocationType::CommuteOneWay),
            "commute_none" => Some(LocationType::CommuteNone),
            "other" => Some(LocationType::Other),
            _ => None,
        }
    }
}

/// One break within a work day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl BreakInterval {
    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

/// One project row from the schedule: either an `H:MM` duration or a
/// percentage string, plus a free-form comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub raw_value: String,
    pub comment: String,
}

/// One normalized day of input. Immutable during processing; resolved
/// project minutes are threaded separately by the engine rather than
/// written back into `project_allocations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDayRecord {
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub location_type: LocationType,
    pub break_intervals: Vec<BreakInterval>,
    pub project_allocations: Vec<ProjectEntry>,
}

impl WorkDayRecord {
    /// The target UI exposes a single break row, so multiple intervals are
    /// merged into one covering interval (earliest start, latest end).
    pub fn collapsed_break(&self) -> Option<BreakInterval> {
        let start = self.break_intervals.iter().map(|b| b.start).min()?;
        let end = self.break_intervals.iter().map(|b| b.end).max()?;
        Some(BreakInterval { start, end })
    }

    /// Total break minutes as listed in the schedule (per-interval sum, not
    /// the collapsed covering interval)
    pub fn break_minutes(&self) -> u32 {
        self.break_intervals.iter().map(|b| b.duration_minutes()).sum()
    }

    /// Worked minutes derived from the schedule: span minus breaks.
    /// Used as the fallback when the live page cannot be read.
    pub fn scheduled_worked_minutes(&self) -> u32 {
        self.end_time
            .minutes()
            .saturating_sub(self.start_time.minutes())
            .saturating_sub(self.break_minutes())
    }

    /// Apply the end-time ceiling. Any end time past the ceiling becomes
    /// exactly the ceiling; earlier times pass through unchanged.
    pub fn with_end_time_ceiling(mut self, ceiling: TimeOfDay) -> Self {
        self.end_time = self.end_time.clamped_to(ceiling);
        self
    }
}

/// Outcome classification for one processed day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Success,
    Failure,
    DryRun,
    Skipped,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Success => "success",
            SubmissionStatus::Failure => "failure",
            SubmissionStatus::DryRun => "dry_run",
            SubmissionStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one processing attempt for one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub date: NaiveDate,
    pub status: SubmissionStatus,
    pub message: String,
    pub processing_time_secs: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionResult {
    pub fn new(date: NaiveDate, status: SubmissionStatus, message: impl Into<String>) -> Self {
        Self {
            date,
            status,
            message: message.into(),
            processing_time_secs: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_processing_time(mut self, secs: f64) -> Self {
        self.processing_time_secs = Some(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    fn record(breaks: Vec<BreakInterval>) -> WorkDayRecord {
        WorkDayRecord {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: t(9, 0),
            end_time: t(18, 0),
            location_type: LocationType::Remote,
            break_intervals: breaks,
            project_allocations: vec![],
        }
    }

    #[test]
    fn time_of_day_parses_and_orders() {
        let a: TimeOfDay = "9:00".parse().unwrap();
        let b: TimeOfDay = "22:15".parse().unwrap();
        assert!(a < b);
        assert_eq!(a.minutes(), 540);
        assert_eq!(b.to_string(), "22:15");
    }

    #[test]
    fn time_of_day_rejects_out_of_range() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn end_time_ceiling_clamps_only_later_times() {
        let ceiling = t(22, 0);
        let late = record(vec![]);
        let mut late = late;
        late.end_time = t(23, 30);
        let clamped = late.with_end_time_ceiling(ceiling);
        assert_eq!(clamped.end_time, t(22, 0));

        let mut exact = record(vec![]);
        exact.end_time = t(22, 0);
        assert_eq!(exact.with_end_time_ceiling(ceiling).end_time, t(22, 0));

        let early = record(vec![]).with_end_time_ceiling(ceiling);
        assert_eq!(early.end_time, t(18, 0));
    }

    #[test]
    fn breaks_collapse_to_covering_interval() {
        let rec = record(vec![
            BreakInterval { start: t(12, 0), end: t(12, 30) },
            BreakInterval { start: t(15, 0), end: t(15, 15) },
        ]);
        let collapsed = rec.collapsed_break().unwrap();
        assert_eq!(collapsed.start, t(12, 0));
        assert_eq!(collapsed.end, t(15, 15));
    }

    #[test]
    fn no_breaks_collapses_to_none() {
        assert!(record(vec![]).collapsed_break().is_none());
    }

    #[test]
    fn scheduled_worked_minutes_subtracts_breaks() {
        let rec = record(vec![
            BreakInterval { start: t(12, 0), end: t(13, 0) },
            BreakInterval { start: t(15, 0), end: t(15, 15) },
        ]);
        // 9h span, 75 minutes of breaks
        assert_eq!(rec.scheduled_worked_minutes(), 540 - 75);
    }

    #[test]
    fn location_form_values_match_deployed_selector() {
        assert_eq!(LocationType::Remote.form_value(), "2");
        assert_eq!(LocationType::CommuteRoundTrip.form_value(), "5");
        assert_eq!(LocationType::CommuteOneWay.form_value(), "6");
        assert_eq!(LocationType::CommuteNone.form_value(), "7");
        assert_eq!(LocationType::Other.form_value(), "4");
    }

    #[test]
    fn location_label_round_trip() {
        for loc in [
            LocationType::Remote,
            LocationType::CommuteRoundTrip,
            LocationType::CommuteOneWay,
            LocationType::CommuteNone,
            LocationType::Other,
        ] {
            assert_eq!(LocationType::from_label(loc.label()), Some(loc));
        }
        assert_eq!(LocationType::from_label("office"), None);
    }

    #[test]
    fn submission_result_carries_processing_time() {
        let r = SubmissionResult::new(
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            SubmissionStatus::Success,
            "submitted",
        )
        .with_processing_time(12.5);
        assert_eq!(r.status, SubmissionStatus::Success);
        assert_eq!(r.processing_time_secs, Some(12.5));
    }
}
