//! Batch driver: iterates days, refreshes the session, recovers and retries
//!
//! The driver owns the browser [`Session`] for the whole batch. Days are
//! processed strictly in the supplied order, each with a bounded retry and
//! DOM-cleanup recovery; a day failure is recorded and the batch moves on.
//! Only next-day navigation exhaustion aborts the batch, because once the
//! page can no longer be advanced, every remaining day is unreachable.

use crate::day::{DayOutcome, DayRunner};
use crate::results::{ResultLog, Summary};
use crate::retry::{retry_with_backoff, retry_with_backoff_if};
use punchcard_browser::{cleanup, Session};
use punchcard_browser::resolver::{self, FieldRole};
use punchcard_core::{
    PunchError, PunchcardConfig, Result, SubmissionResult, SubmissionStatus, WorkDayRecord,
};
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const NEXT_DAY_NAV_ATTEMPTS: usize = 3;

/// Drives a whole batch of day records through one browser session
pub struct BatchDriver {
    session: Session,
    config: PunchcardConfig,
    log: ResultLog,
}

impl BatchDriver {
    pub fn new(session: Session, config: PunchcardConfig) -> Self {
        Self {
            session,
            config,
            log: ResultLog::new(),
        }
    }

    /// Seed the driver with previously persisted results (retry mode)
    pub fn with_log(session: Session, config: PunchcardConfig, log: ResultLog) -> Self {
        Self { session, config, log }
    }

    pub fn results(&self) -> &ResultLog {
        &self.log
    }

    /// Process every record in order. Returns the run summary; errors only
    /// on conditions that make the rest of the batch unreachable.
    pub async fn process_all(&mut self, records: &[WorkDayRecord], dry_run: bool) -> Result<Summary> {
        info!("Starting batch of {} day(s) (dry run: {})", records.len(), dry_run);

        if dry_run {
            record_dry_runs(&mut self.log, records);
        } else {
            for (index, record) in records.iter().enumerate() {
                // Long batches decay the page session; reload before every
                // Nth record.
                if needs_session_refresh(index, self.config.session_refresh_interval) {
                    self.refresh_session().await?;
                }

                self.process_one(record).await;

                if index + 1 < records.len() {
                    self.advance_to_next_day().await?;
                }
            }
        }

        let summary = self.log.summary();
        info!(
            "Batch finished: {} success, {} failure, {} dry-run, {} skipped",
            summary.success, summary.failure, summary.dry_run, summary.skipped
        );
        Ok(summary)
    }

    /// Re-run only the dates whose latest result is a failure. Each retried
    /// date's failure entry is removed first; other dates are untouched.
    pub async fn retry_failed(&mut self, records: &[WorkDayRecord]) -> Result<Summary> {
        let failed = self.log.failed_dates();
        info!("Retrying {} failed date(s)", failed.len());

        for date in failed {
            let Some(record) = records.iter().find(|r| r.date == date) else {
                warn!("No schedule record for failed date {}, leaving it as is", date);
                continue;
            };
            self.log.remove_failure(date);
            self.process_one(record).await;
        }
        Ok(self.log.summary())
    }

    /// One day with bounded retry and recovery; failure is recorded, never
    /// propagated.
    async fn process_one(&mut self, record: &WorkDayRecord) {
        let started = Instant::now();
        let outcome = self.run_with_retry(record).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(DayOutcome { message, .. }) => {
                self.log.push(
                    SubmissionResult::new(record.date, SubmissionStatus::Success, message)
                        .with_processing_time(elapsed),
                );
            }
            Err(e) => {
                error!("Day {} failed: {}", record.date, e);
                let label = format!("failure_{}", record.date.format("%Y%m%d"));
                if let Err(shot_err) = self
                    .session
                    .save_screenshot(&self.config.screenshot_dir, &label)
                    .await
                {
                    warn!("Could not capture failure screenshot: {}", shot_err);
                }
                // Leave the page in a workable state for the next record.
                if let Err(cleanup_err) = cleanup::clear_transient_state(&self.session).await {
                    warn!("Post-failure cleanup failed: {}", cleanup_err);
                }
                self.log.push(
                    SubmissionResult::new(record.date, SubmissionStatus::Failure, e.to_string())
                        .with_processing_time(elapsed),
                );
            }
        }
    }

    async fn run_with_retry(&self, record: &WorkDayRecord) -> Result<DayOutcome> {
        let session = &self.session;
        let config = &self.config;
        retry_with_backoff_if(
            config.max_day_attempts,
            Duration::from_secs(1),
            &format!("day {}", record.date),
            is_transient_day_error,
            |attempt| async move {
                if attempt > 1 {
                    cleanup::clear_transient_state(session).await?;
                }
                DayRunner::new(session, config).run(record).await
            },
        )
        .await
    }

    /// Reload the page and wait until a known input is usable again
    async fn refresh_session(&self) -> Result<()> {
        info!("Refreshing page session");
        self.session.reload().await?;
        self.session
            .wait_for_page_load(Duration::from_secs(self.config.page_load_timeout_secs))
            .await?;

        // The form attaches after load; make sure a known field is back
        // before the next day starts typing into it.
        let timeout = Duration::from_secs(self.config.element_timeout_secs);
        if let Err(e) = resolver::resolve(&self.session, FieldRole::StartTime, timeout).await {
            warn!("Start time field not ready after refresh: {}", e);
        }
        Ok(())
    }

    /// Move the page to the next day. Preferred path extracts the target
    /// URL from the page's own next-day handler; falls back to clicking the
    /// control, then to a bare reload. Exhaustion is fatal to the batch.
    async fn advance_to_next_day(&self) -> Result<()> {
        let nav = retry_with_backoff(
            NEXT_DAY_NAV_ATTEMPTS,
            Duration::from_secs(1),
            "next-day navigation",
            |attempt| async move {
                if attempt > 1 {
                    self.session.reload().await?;
                    self.session
                        .wait_for_page_load(Duration::from_secs(self.config.page_load_timeout_secs))
                        .await?;
                }
                self.navigate_via_onclick_url().await
            },
        )
        .await;
        if nav.is_ok() {
            return Ok(());
        }

        warn!("URL-extraction navigation exhausted, falling back to clicking the control");
        if self.click_next_day_control().await.unwrap_or(false) {
            self.session
                .wait_for_page_load(Duration::from_secs(self.config.page_load_timeout_secs))
                .await?;
            return Ok(());
        }

        warn!("Next-day control not clickable, falling back to a bare reload");
        self.session.reload().await.map_err(|e| {
            PunchError::Navigation(format!("all next-day strategies exhausted: {}", e))
        })?;
        self.session
            .wait_for_page_load(Duration::from_secs(self.config.page_load_timeout_secs))
            .await
    }

    /// Read the next-day control's onclick handler, extract its target URL
    /// and navigate there directly
    async fn navigate_via_onclick_url(&self) -> Result<()> {
        let onclick = self
            .session
            .evaluate(NEXT_DAY_ONCLICK_LOOKUP)
            .await?
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PunchError::Navigation("no next-day handler found".to_string()))?;

        let target = extract_onclick_url(&onclick).ok_or_else(|| {
            PunchError::Navigation(format!("no URL in next-day handler: {}", onclick))
        })?;

        let current = self.session.current_url().await?;
        let full = resolve_target_url(&current, &target);
        info!("Navigating to next day: {}", full);
        self.session.navigate(&full).await?;
        self.session
            .wait_for_page_load(Duration::from_secs(self.config.page_load_timeout_secs))
            .await
    }

    async fn click_next_day_control(&self) -> Result<bool> {
        let script = "(function() { \
             var el = document.querySelector(\"[onclick*='ToNextDateAction']\") \
               || document.querySelector(\"[title*='翌日']\") \
               || document.querySelector(\"[onclick*='翌日']\"); \
             if (!el) return false; \
             el.click(); \
             return true; \
           })()";
        Ok(self.session.evaluate(script).await?.as_bool().unwrap_or(false))
    }
}

/// Record every schedule record as validated-only, in input order, without
/// touching the browser
fn record_dry_runs(log: &mut ResultLog, records: &[WorkDayRecord]) {
    for record in records {
        log.push(SubmissionResult::new(
            record.date,
            SubmissionStatus::DryRun,
            "validated, not submitted",
        ));
    }
}

/// Reload cadence: before every `interval`-th record (1-based), never before
/// the first
fn needs_session_refresh(index: usize, interval: usize) -> bool {
    interval > 0 && index > 0 && (index + 1) % interval == 0
}

/// A day attempt is only worth repeating when the failure could have been
/// caused by page state: blocking validation messages and unresolvable
/// mandatory fields will fail the same way every time, so they are recorded
/// without burning a second pass through the form.
fn is_transient_day_error(e: &PunchError) -> bool {
    !matches!(
        e,
        PunchError::ValidationFailed(_) | PunchError::ElementNotFound(_)
    )
}

/// Finds the next-day control and returns its onclick handler source
const NEXT_DAY_ONCLICK_LOOKUP: &str = "(function() { \
     var el = document.querySelector(\"[onclick*='ToNextDateAction']\") \
       || document.querySelector(\"[onclick*='翌日']\") \
       || document.querySelector(\"[title*='翌日'][onclick]\"); \
     return el ? el.getAttribute('onclick') : null; \
   })()";

/// Pull the navigation target out of a `location.href='...'` style handler
pub fn extract_onclick_url(onclick: &str) -> Option<String> {
    let re = Regex::new(r#"location\.href\s*=\s*['"]([^'"]+)['"]"#).ok()?;
    re.captures(onclick).map(|caps| caps[1].to_string())
}

/// Resolve a possibly-relative navigation target against the current URL
pub fn resolve_target_url(current: &str, target: &str) -> String {
    if target.starts_with("http") {
        return target.to_string();
    }
    if target.starts_with('/') {
        // protocol://host[:port] + absolute path
        let origin: Vec<&str> = current.splitn(4, '/').take(3).collect();
        return format!("{}{}", origin.join("/"), target);
    }
    // relative to the current URL's directory
    match current.rfind('/') {
        Some(pos) if pos > "https://".len() => format!("{}/{}", &current[..pos], target),
        _ => format!("{}/{}", current, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use punchcard_core::{LocationType, TimeOfDay};

    fn record(day: u32) -> WorkDayRecord {
        WorkDayRecord {
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            start_time: TimeOfDay::new(9, 0).unwrap(),
            end_time: TimeOfDay::new(18, 0).unwrap(),
            location_type: LocationType::Remote,
            break_intervals: vec![],
            project_allocations: vec![],
        }
    }

    #[test]
    fn dry_run_records_each_date_once_in_input_order() {
        // deliberately unsorted: the log must mirror the input, not reorder
        let records = vec![record(3), record(1), record(2)];
        let mut log = ResultLog::new();

        record_dry_runs(&mut log, &records);

        let entries = log.all();
        assert_eq!(entries.len(), records.len());
        for (entry, record) in entries.iter().zip(&records) {
            assert_eq!(entry.date, record.date);
            assert_eq!(entry.status, SubmissionStatus::DryRun);
        }
    }

    #[test]
    fn session_refresh_fires_before_every_fifth_record() {
        let refreshed: Vec<usize> = (0..12).filter(|&i| needs_session_refresh(i, 5)).collect();
        assert_eq!(refreshed, vec![4, 9]);
    }

    #[test]
    fn session_refresh_never_fires_before_the_first_record() {
        assert!(!needs_session_refresh(0, 1));
        assert!(!needs_session_refresh(0, 5));
    }

    #[test]
    fn zero_refresh_interval_disables_refreshing() {
        assert!(!needs_session_refresh(7, 0));
    }

    #[test]
    fn blocking_day_errors_are_not_retried() {
        assert!(!is_transient_day_error(&PunchError::ValidationFailed(
            "忘年会の時間が勤務時間と重複しています".to_string()
        )));
        assert!(!is_transient_day_error(&PunchError::ElementNotFound(
            "start time field".to_string()
        )));
        assert!(is_transient_day_error(&PunchError::Browser(
            "tab crashed".to_string()
        )));
        assert!(is_transient_day_error(&PunchError::Input(
            "start time field holds \"\" after writing \"9:00\"".to_string()
        )));
    }

    #[test]
    fn extracts_url_from_onclick_handler() {
        let onclick = "javascript:location.href='TimeSheet?date=20250603&mode=edit';return false;";
        assert_eq!(
            extract_onclick_url(onclick),
            Some("TimeSheet?date=20250603&mode=edit".to_string())
        );

        let double_quoted = r#"location.href = "/app/next""#;
        assert_eq!(extract_onclick_url(double_quoted), Some("/app/next".to_string()));

        assert_eq!(extract_onclick_url("doSomethingElse()"), None);
    }

    #[test]
    fn absolute_targets_pass_through() {
        assert_eq!(
            resolve_target_url("https://ts.example.com/app/page", "https://other/x"),
            "https://other/x"
        );
    }

    #[test]
    fn root_relative_targets_join_the_origin() {
        assert_eq!(
            resolve_target_url("https://ts.example.com:8443/app/page?d=1", "/app/next"),
            "https://ts.example.com:8443/app/next"
        );
    }

    #[test]
    fn relative_targets_join_the_current_directory() {
        assert_eq!(
            resolve_target_url("https://ts.example.com/app/page", "next?d=2"),
            "https://ts.example.com/app/next?d=2"
        );
    }
}
