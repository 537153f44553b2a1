//! Schedule CSV loading and validation
//!
//! One row per calendar day. Fixed columns `date`, `start_time`,
//! `end_time`, `location`; break and project columns are dynamic
//! (`break1_start`/`break1_end`, `project1_time`/`project1_comment`, any
//! count). Validation runs over the whole file and reports every bad row,
//! not just the first; a schedule with any error never reaches the browser.

use chrono::NaiveDate;
use punchcard_core::time::parse_duration_minutes;
use punchcard_core::{
    BreakInterval, LocationType, ProjectEntry, PunchError, Result, TimeOfDay, WorkDayRecord,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const DATE_COLUMN: &str = "date";
const START_COLUMN: &str = "start_time";
const END_COLUMN: &str = "end_time";
const LOCATION_COLUMN: &str = "location";

/// A validated schedule, in file order
#[derive(Debug, Clone)]
pub struct Schedule {
    records: Vec<WorkDayRecord>,
}

impl Schedule {
    /// Load and validate a schedule file. Any validation error fails the
    /// load, with every offending row named in the message.
    pub fn load(path: &Path) -> Result<Self> {
        let (records, errors) = read_file(path)?;
        if !errors.is_empty() {
            return Err(PunchError::Schedule(format!(
                "{} validation error(s) in {}:\n  {}",
                errors.len(),
                path.display(),
                errors.join("\n  ")
            )));
        }
        info!("Loaded {} day(s) from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Validate without constructing; returns every row error found
    pub fn validate(path: &Path) -> Result<Vec<String>> {
        let (_, errors) = read_file(path)?;
        Ok(errors)
    }

    pub fn records(&self) -> &[WorkDayRecord] {
        &self.records
    }

    pub fn record_by_date(&self, date: NaiveDate) -> Option<&WorkDayRecord> {
        self.records.iter().find(|r| r.date == date)
    }

    /// Records within an inclusive date range, preserving file order
    pub fn filter_range(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<WorkDayRecord> {
        self.records
            .iter()
            .filter(|r| from.map_or(true, |f| r.date >= f) && to.map_or(true, |t| r.date <= t))
            .cloned()
            .collect()
    }
}

fn read_file(path: &Path) -> Result<(Vec<WorkDayRecord>, Vec<String>)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut seen_dates = HashSet::new();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        // +2: one for the header line, one for 1-based numbering
        let line = index + 2;
        match parse_row(&headers, &row, line) {
            Ok(record) => {
                if !seen_dates.insert(record.date) {
                    errors.push(format!("row {}: duplicate date {}", line, record.date));
                } else {
                    records.push(record);
                }
            }
            Err(row_errors) => errors.extend(row_errors),
        }
    }

    Ok((records, errors))
}

/// Parse one row, accumulating every field error instead of stopping at
/// the first
fn parse_row(
    headers: &csv::StringRecord,
    row: &csv::StringRecord,
    line: usize,
) -> std::result::Result<WorkDayRecord, Vec<String>> {
    let mut errors = Vec::new();

    let date = match field(headers, row, DATE_COLUMN) {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(format!("row {}: date {:?} is not YYYY-MM-DD", line, raw));
                None
            }
        },
        None => {
            errors.push(format!("row {}: date is missing", line));
            None
        }
    };

    let mut time_field = |name: &str| -> Option<TimeOfDay> {
        match field(headers, row, name) {
            Some(raw) => match raw.parse() {
                Ok(time) => Some(time),
                Err(_) => {
                    errors.push(format!("row {}: {} {:?} is not HH:MM", line, name, raw));
                    None
                }
            },
            None => {
                errors.push(format!("row {}: {} is missing", line, name));
                None
            }
        }
    };
    let start_time = time_field(START_COLUMN);
    let end_time = time_field(END_COLUMN);

    if let (Some(start), Some(end)) = (start_time, end_time) {
        if start >= end {
            errors.push(format!("row {}: start time {} is not before end time {}", line, start, end));
        }
    }

    let location_type = match field(headers, row, LOCATION_COLUMN) {
        Some(raw) => match LocationType::from_label(raw) {
            Some(location) => Some(location),
            None => {
                errors.push(format!("row {}: unknown location {:?}", line, raw));
                None
            }
        },
        None => {
            errors.push(format!("row {}: location is missing", line));
            None
        }
    };

    let break_intervals = parse_breaks(headers, row, line, &mut errors);
    let project_allocations = parse_projects(headers, row, line, &mut errors);

    match (date, start_time, end_time, location_type) {
        (Some(date), Some(start_time), Some(end_time), Some(location_type)) if errors.is_empty() => {
            Ok(WorkDayRecord {
                date,
                start_time,
                end_time,
                location_type,
                break_intervals,
                project_allocations,
            })
        }
        _ => Err(errors),
    }
}

/// Non-empty, trimmed value of a named column, if the column exists
fn field<'a>(headers: &csv::StringRecord, row: &'a csv::StringRecord, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .position(|h| h == name)
        .and_then(|i| row.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_breaks(
    headers: &csv::StringRecord,
    row: &csv::StringRecord,
    line: usize,
    errors: &mut Vec<String>,
) -> Vec<BreakInterval> {
    let mut intervals = Vec::new();
    for n in 1.. {
        let start_col = format!("break{}_start", n);
        let end_col = format!("break{}_end", n);
        let Some(start_idx) = headers.iter().position(|h| h == start_col) else {
            break;
        };
        let end_idx = headers.iter().position(|h| h == end_col);

        let start_raw = row.get(start_idx).map(str::trim).unwrap_or("");
        let end_raw = end_idx
            .and_then(|i| row.get(i))
            .map(str::trim)
            .unwrap_or("");
        if start_raw.is_empty() && end_raw.is_empty() {
            continue;
        }

        match (start_raw.parse::<TimeOfDay>(), end_raw.parse::<TimeOfDay>()) {
            (Ok(start), Ok(end)) => intervals.push(BreakInterval { start, end }),
            _ => errors.push(format!(
                "row {}: break {} times {:?}/{:?} are not HH:MM pairs",
                line, n, start_raw, end_raw
            )),
        }
    }
    intervals
}

fn parse_projects(
    headers: &csv::StringRecord,
    row: &csv::StringRecord,
    line: usize,
    errors: &mut Vec<String>,
) -> Vec<ProjectEntry> {
    let mut entries = Vec::new();
    for n in 1.. {
        let time_col = format!("project{}_time", n);
        let comment_col = format!("project{}_comment", n);
        let Some(time_idx) = headers.iter().position(|h| h == time_col) else {
            break;
        };

        let raw_value = row.get(time_idx).map(str::trim).unwrap_or("").to_string();
        let comment = headers
            .iter()
            .position(|h| h == comment_col)
            .and_then(|i| row.get(i))
            .map(str::trim)
            .unwrap_or("")
            .to_string();

        if raw_value.is_empty() && comment.is_empty() {
            continue;
        }
        if !raw_value.is_empty() && !is_valid_project_time(&raw_value) {
            errors.push(format!(
                "row {}: project {} time {:?} is neither H:MM nor a percentage in (0,100]",
                line, n, raw_value
            ));
        }
        entries.push(ProjectEntry { raw_value, comment });
    }
    entries
}

/// `H:MM` duration or `NN%` / `NN.N%` percentage in `(0, 100]`
fn is_valid_project_time(raw: &str) -> bool {
    let raw = raw.trim();
    if parse_duration_minutes(raw).is_some() {
        return true;
    }
    if let Some(number) = raw.strip_suffix('%') {
        if let Ok(pct) = number.trim().parse::<f64>() {
            return pct > 0.0 && pct <= 100.0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "date,start_time,end_time,location,break1_start,break1_end,break2_start,break2_end,project1_time,project1_comment,project2_time,project2_comment";

    fn write_schedule(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(f, "{}", row).unwrap();
        }
        f
    }

    #[test]
    fn loads_a_valid_schedule() {
        let f = write_schedule(&[
            "2025-06-02,09:00,18:00,remote,12:00,13:00,15:00,15:15,60%,dev,40%,review",
            "2025-06-03,09:00,17:30,commute_round_trip,12:00,13:00,,,100%,dev,,",
        ]);
        let schedule = Schedule::load(f.path()).unwrap();
        assert_eq!(schedule.records().len(), 2);

        let first = &schedule.records()[0];
        assert_eq!(first.break_intervals.len(), 2);
        assert_eq!(first.project_allocations.len(), 2);
        assert_eq!(first.project_allocations[0].raw_value, "60%");
        assert_eq!(first.project_allocations[1].comment, "review");

        let second = &schedule.records()[1];
        assert_eq!(second.break_intervals.len(), 1);
        assert_eq!(second.project_allocations.len(), 1);
        assert_eq!(second.location_type, LocationType::CommuteRoundTrip);
    }

    #[test]
    fn reports_every_bad_row() {
        let f = write_schedule(&[
            "2025-06-02,09:00,18:00,remote,,,,,50%,,,",
            "06/03/2025,09:00,18:00,remote,,,,,,,,",
            "2025-06-04,18:00,09:00,office,,,,,,,,",
        ]);
        let errors = Schedule::validate(f.path()).unwrap();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("row 3"));
        assert!(errors[0].contains("YYYY-MM-DD"));
        assert!(errors.iter().any(|e| e.contains("not before")));
        assert!(errors.iter().any(|e| e.contains("unknown location")));

        assert!(Schedule::load(f.path()).is_err());
    }

    #[test]
    fn rejects_duplicate_dates() {
        let f = write_schedule(&[
            "2025-06-02,09:00,18:00,remote,,,,,,,,",
            "2025-06-02,10:00,18:00,remote,,,,,,,,",
        ]);
        let errors = Schedule::validate(f.path()).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate date"));
    }

    #[test]
    fn project_time_accepts_durations_and_bounded_percentages() {
        assert!(is_valid_project_time("7:30"));
        assert!(is_valid_project_time("0:45"));
        assert!(is_valid_project_time("50%"));
        assert!(is_valid_project_time("12.5%"));
        assert!(is_valid_project_time("100%"));

        assert!(!is_valid_project_time("0%"));
        assert!(!is_valid_project_time("101%"));
        assert!(!is_valid_project_time("1:60"));
        assert!(!is_valid_project_time("half"));
    }

    #[test]
    fn comment_only_project_keeps_its_row_position() {
        let f = write_schedule(&["2025-06-02,09:00,18:00,remote,,,,,,note only,50%,dev"]);
        let schedule = Schedule::load(f.path()).unwrap();
        let entries = &schedule.records()[0].project_allocations;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].raw_value, "");
        assert_eq!(entries[0].comment, "note only");
    }

    #[test]
    fn filter_range_is_inclusive() {
        let f = write_schedule(&[
            "2025-06-02,09:00,18:00,remote,,,,,,,,",
            "2025-06-03,09:00,18:00,remote,,,,,,,,",
            "2025-06-04,09:00,18:00,remote,,,,,,,,",
        ]);
        let schedule = Schedule::load(f.path()).unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();

        assert_eq!(schedule.filter_range(Some(d(3)), None).len(), 2);
        assert_eq!(schedule.filter_range(None, Some(d(3))).len(), 2);
        assert_eq!(schedule.filter_range(Some(d(3)), Some(d(3))).len(), 1);
        assert_eq!(schedule.filter_range(None, None).len(), 3);
        assert!(schedule.record_by_date(d(4)).is_some());
        assert!(schedule.record_by_date(d(5)).is_none());
    }
}
