//! Append-only submission result log
//!
//! Every processing attempt for every date is appended, never rewritten; a
//! date that failed and later succeeded keeps both entries. "Failed dates"
//! are judged by each date's most recent entry, so the audit trail stays
//! intact while retry logic sees current state.

use chrono::NaiveDate;
use punchcard_core::{Result, SubmissionResult, SubmissionStatus};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// In-memory result log with CSV persistence
#[derive(Debug, Default)]
pub struct ResultLog {
    results: Vec<SubmissionResult>,
}

/// Per-status counts for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub success: usize,
    pub failure: usize,
    pub dry_run: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.success + self.failure + self.dry_run + self.skipped
    }

    pub fn overall_success(&self) -> bool {
        self.failure == 0
    }
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: SubmissionResult) {
        self.results.push(result);
    }

    pub fn all(&self) -> &[SubmissionResult] {
        &self.results
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in &self.results {
            match result.status {
                SubmissionStatus::Success => summary.success += 1,
                SubmissionStatus::Failure => summary.failure += 1,
                SubmissionStatus::DryRun => summary.dry_run += 1,
                SubmissionStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Dates whose most recent entry is a failure, in date order
    pub fn failed_dates(&self) -> Vec<NaiveDate> {
        let mut latest: BTreeMap<NaiveDate, SubmissionStatus> = BTreeMap::new();
        for result in &self.results {
            latest.insert(result.date, result.status);
        }
        latest
            .into_iter()
            .filter(|(_, status)| *status == SubmissionStatus::Failure)
            .map(|(date, _)| date)
            .collect()
    }

    /// Remove the most recent failure entry for `date`, leaving every other
    /// entry (including the date's own earlier history) untouched. Returns
    /// whether an entry was removed.
    pub fn remove_failure(&mut self, date: NaiveDate) -> bool {
        let position = self
            .results
            .iter()
            .rposition(|r| r.date == date && r.status == SubmissionStatus::Failure);
        match position {
            Some(index) => {
                self.results.remove(index);
                true
            }
            None => false,
        }
    }

    /// Write the full log as CSV (date, status, message, processing time,
    /// timestamp)
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        info!("Wrote {} result(s) to {}", self.results.len(), path.display());
        Ok(())
    }

    /// Load a previously written log, e.g. for retry-failed-only mode
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut results = Vec::new();
        for row in reader.deserialize() {
            results.push(row?);
        }
        Ok(Self { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn entry(day: u32, status: SubmissionStatus) -> SubmissionResult {
        SubmissionResult::new(date(day), status, "test")
    }

    #[test]
    fn failed_dates_follow_most_recent_entry() {
        let mut log = ResultLog::new();
        log.push(entry(2, SubmissionStatus::Failure));
        log.push(entry(3, SubmissionStatus::Failure));
        // day 2 later succeeded; only day 3 is still failed
        log.push(entry(2, SubmissionStatus::Success));
        assert_eq!(log.failed_dates(), vec![date(3)]);
    }

    #[test]
    fn remove_failure_is_isolated_to_one_entry() {
        let mut log = ResultLog::new();
        log.push(entry(2, SubmissionStatus::Success));
        log.push(entry(3, SubmissionStatus::Failure));
        log.push(entry(4, SubmissionStatus::Failure));

        assert!(log.remove_failure(date(3)));
        assert_eq!(log.all().len(), 2);
        assert_eq!(log.failed_dates(), vec![date(4)]);
        // day 2's history is untouched
        assert_eq!(log.all()[0].date, date(2));

        assert!(!log.remove_failure(date(3)));
    }

    #[test]
    fn remove_failure_takes_the_latest_failure() {
        let mut log = ResultLog::new();
        log.push(entry(3, SubmissionStatus::Failure));
        log.push(entry(3, SubmissionStatus::Failure));
        assert!(log.remove_failure(date(3)));
        // the older failure remains part of the audit trail
        assert_eq!(log.all().len(), 1);
        assert_eq!(log.failed_dates(), vec![date(3)]);
    }

    #[test]
    fn summary_counts_by_status() {
        let mut log = ResultLog::new();
        log.push(entry(2, SubmissionStatus::Success));
        log.push(entry(3, SubmissionStatus::DryRun));
        log.push(entry(4, SubmissionStatus::Failure));
        let summary = log.summary();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.dry_run, 1);
        assert_eq!(summary.failure, 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.overall_success());
    }

    #[test]
    fn csv_round_trip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let mut log = ResultLog::new();
        log.push(entry(2, SubmissionStatus::Success).with_processing_time(8.25));
        log.push(entry(3, SubmissionStatus::Failure));
        log.write_csv(&path).unwrap();

        let loaded = ResultLog::load_csv(&path).unwrap();
        assert_eq!(loaded.all().len(), 2);
        assert_eq!(loaded.all()[0].processing_time_secs, Some(8.25));
        assert_eq!(loaded.failed_dates(), vec![date(3)]);
    }
}
