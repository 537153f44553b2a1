//! Schedule template generation
//!
//! Emits a starter CSV covering the weekdays from a start date, pre-filled
//! with a standard 9-to-6 remote day and a lunch break, with two break and
//! four project column pairs to fill in.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use punchcard_core::Result;
use std::path::{Path, PathBuf};
use tracing::info;

const BREAK_COLUMNS: usize = 2;
const PROJECT_COLUMNS: usize = 4;

/// Write a template CSV into `dir`, named `work_template_YYYYMMDD.csv`
/// after the start date. `days` counts calendar days; weekends are skipped.
///
/// # Returns
/// Path of the written file
pub fn write_template(dir: &Path, start: NaiveDate, days: u32) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("work_template_{}.csv", start.format("%Y%m%d")));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(header())?;

    let mut written = 0;
    for offset in 0..days {
        let date = start + Duration::days(offset as i64);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        writer.write_record(default_row(date))?;
        written += 1;
    }
    writer.flush()?;

    info!("Wrote template with {} weekday row(s) to {}", written, path.display());
    Ok(path)
}

fn header() -> Vec<String> {
    let mut columns = vec![
        "date".to_string(),
        "start_time".to_string(),
        "end_time".to_string(),
        "location".to_string(),
    ];
    for n in 1..=BREAK_COLUMNS {
        columns.push(format!("break{}_start", n));
        columns.push(format!("break{}_end", n));
    }
    for n in 1..=PROJECT_COLUMNS {
        columns.push(format!("project{}_time", n));
        columns.push(format!("project{}_comment", n));
    }
    columns
}

fn default_row(date: NaiveDate) -> Vec<String> {
    let mut row = vec![
        date.format("%Y-%m-%d").to_string(),
        "09:00".to_string(),
        "18:00".to_string(),
        "remote".to_string(),
        "12:00".to_string(),
        "13:00".to_string(),
    ];
    // second break pair and all project pairs start empty
    row.resize(4 + 2 * BREAK_COLUMNS + 2 * PROJECT_COLUMNS, String::new());
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;

    #[test]
    fn template_skips_weekends() {
        let dir = tempfile::tempdir().unwrap();
        // 2025-06-06 is a Friday; 7 calendar days cover one weekend
        let start = NaiveDate::from_ymd_opt(2025, 6, 6).unwrap();
        let path = write_template(dir.path(), start, 7).unwrap();
        assert!(path.ends_with("work_template_20250606.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        // header + 5 weekdays (Fri, Mon-Thu)
        assert_eq!(rows.len(), 6);
        assert!(rows[1].starts_with("2025-06-06"));
        assert!(rows[2].starts_with("2025-06-09"));
    }

    #[test]
    fn template_is_loadable_as_a_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let path = write_template(dir.path(), start, 5).unwrap();

        let schedule = Schedule::load(&path).unwrap();
        assert_eq!(schedule.records().len(), 5);
        let record = &schedule.records()[0];
        assert_eq!(record.start_time.to_string(), "09:00");
        assert_eq!(record.break_intervals.len(), 1);
        assert!(record.project_allocations.is_empty());
    }
}
