//! Single-day submission state machine
//!
//! One day flows through a fixed sequence: work span, breaks, a calculate
//! pass so the page exposes actual worked time, project allocation and
//! entry, a second calculate pass, error classification (with the one
//! night-work autocorrection), then save and submit. Any step failure
//! surfaces as an error; the batch driver decides about retries.

use crate::allocate::allocate;
use crate::retry::retry_with_backoff;
use punchcard_browser::resolver::{self, FieldRole};
use punchcard_browser::{dom, input, Session};
use punchcard_core::time::{format_duration, parse_duration_minutes};
use punchcard_core::{PunchError, PunchcardConfig, Result, TimeOfDay, WorkDayRecord};
use std::time::Duration;
use tracing::{debug, info, warn};

const GRID_ENTRY_ATTEMPTS: usize = 3;

/// How a completed day ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub message: String,
    /// Day passed with only the tolerated location-type validation error
    pub skipped: bool,
}

/// What the page's validation errors amount to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorVerdict {
    Clean,
    /// Only the tolerated location-type error remains
    SkipAcceptable,
    Blocking(Vec<String>),
}

/// Runs the submission sequence for single days against a borrowed session
pub struct DayRunner<'a> {
    session: &'a Session,
    config: &'a PunchcardConfig,
}

impl<'a> DayRunner<'a> {
    pub fn new(session: &'a Session, config: &'a PunchcardConfig) -> Self {
        Self { session, config }
    }

    /// Submit one day. Errors are left to the batch driver's retry policy.
    pub async fn run(&self, record: &WorkDayRecord) -> Result<DayOutcome> {
        let ceiling = self.config.ceiling()?;
        let record = record.clone().with_end_time_ceiling(ceiling);
        info!("Processing {}", record.date);

        self.enter_work_span(&record).await?;
        self.enter_breaks(&record).await?;
        self.calculate().await?;

        let resolved = self.resolve_allocations(&record).await?;
        self.enter_projects(&resolved).await?;
        self.calculate().await?;

        let skipped = self.check_errors(ceiling).await?;
        self.advance().await?;

        let message = if skipped {
            "submitted (location-type validation tolerated)".to_string()
        } else {
            "submitted".to_string()
        };
        Ok(DayOutcome { message, skipped })
    }

    fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.config.element_timeout_secs)
    }

    async fn enter_work_span(&self, record: &WorkDayRecord) -> Result<()> {
        let timeout = self.element_timeout();
        input::set_field_value(self.session, FieldRole::StartTime, &record.start_time.to_string(), timeout).await?;
        input::set_field_value(self.session, FieldRole::EndTime, &record.end_time.to_string(), timeout).await?;
        // The location selector is mandatory; failing to resolve it fails
        // the whole day.
        input::select_location(self.session, record.location_type.form_value(), timeout).await?;
        Ok(())
    }

    async fn enter_breaks(&self, record: &WorkDayRecord) -> Result<()> {
        let Some(interval) = record.collapsed_break() else {
            debug!("No breaks scheduled for {}", record.date);
            return Ok(());
        };
        let timeout = self.element_timeout();
        input::set_field_value(self.session, FieldRole::BreakStart, &interval.start.to_string(), timeout).await?;
        input::set_field_value(self.session, FieldRole::BreakEnd, &interval.end.to_string(), timeout).await?;
        Ok(())
    }

    /// Trigger a calculation pass and let the page settle
    async fn calculate(&self) -> Result<()> {
        let locator =
            resolver::resolve(self.session, FieldRole::CalculateButton, self.element_timeout()).await?;
        dom::click(self.session, &locator).await?;
        tokio::time::sleep(Duration::from_secs(self.config.calculate_settle_secs)).await;
        Ok(())
    }

    /// Resolve project allocations to absolute minutes per row
    ///
    /// Worked minutes come from the live page when readable, else from the
    /// schedule. With a usable total the percentage engine runs; without
    /// one, duration-shaped entries pass through as-is.
    async fn resolve_allocations(&self, record: &WorkDayRecord) -> Result<Vec<u32>> {
        if record.project_allocations.is_empty() {
            return Ok(Vec::new());
        }

        let worked = match self.live_worked_minutes().await {
            Some(minutes) => {
                info!("Using worked minutes from page: {} ({})", minutes, format_duration(minutes));
                minutes
            }
            None => {
                let minutes = record.scheduled_worked_minutes();
                warn!("Could not read worked minutes from page, using schedule: {}", minutes);
                minutes
            }
        };

        if worked == 0 {
            warn!("Worked minutes is zero, passing durations through unallocated");
            return Ok(record
                .project_allocations
                .iter()
                .map(|entry| parse_duration_minutes(&entry.raw_value).unwrap_or(0))
                .collect());
        }

        Ok(allocate(&record.project_allocations, worked))
    }

    /// Worked minutes as the page currently shows them: live span minus the
    /// live break interval. `None` when any needed field is unreadable.
    async fn live_worked_minutes(&self) -> Option<u32> {
        let quick = Duration::from_secs(self.config.quick_timeout_secs);
        let start = self.read_time_field(FieldRole::StartTime, quick).await?;
        let end = self.read_time_field(FieldRole::EndTime, quick).await?;
        let span = end.minutes().checked_sub(start.minutes())?;

        let break_minutes = match (
            self.read_time_field(FieldRole::BreakStart, quick).await,
            self.read_time_field(FieldRole::BreakEnd, quick).await,
        ) {
            (Some(bs), Some(be)) => be.minutes().saturating_sub(bs.minutes()),
            _ => 0,
        };
        Some(span.saturating_sub(break_minutes))
    }

    async fn read_time_field(&self, role: FieldRole, timeout: Duration) -> Option<TimeOfDay> {
        let locator = resolver::resolve(self.session, role, timeout).await.ok()?;
        let value = dom::read_value(self.session, &locator).await.ok()??;
        value.parse().ok()
    }

    /// Enter each nonzero allocation into its grid row. The grid's inline
    /// editor attaches lazily, so each cell gets a bounded retry.
    async fn enter_projects(&self, resolved: &[u32]) -> Result<()> {
        let timeout = self.element_timeout();
        for (index, &minutes) in resolved.iter().enumerate() {
            if minutes == 0 {
                continue;
            }
            let value = format_duration(minutes);
            retry_with_backoff(
                GRID_ENTRY_ATTEMPTS,
                Duration::from_secs(1),
                &format!("project row {} entry", index),
                |_| input::set_grid_cell_value(self.session, index, &value, timeout),
            )
            .await?;
        }
        Ok(())
    }

    /// Read validation errors, attempt the night-work autocorrection once,
    /// then classify what remains. Returns whether the day passed on the
    /// skip-acceptable rule.
    async fn check_errors(&self, ceiling: TimeOfDay) -> Result<bool> {
        let mut errors = resolver::read_validation_errors(self.session).await?;

        if errors.iter().any(|e| is_night_work_error(e)) {
            // Business-rule mitigation: force the end time down to the
            // ceiling and recalculate, whatever the true cause was.
            warn!("Night-work validation error detected, forcing end time to {}", ceiling);
            input::set_field_value(
                self.session,
                FieldRole::EndTime,
                &ceiling.to_string(),
                self.element_timeout(),
            )
            .await?;
            self.calculate().await?;
            errors = resolver::read_validation_errors(self.session).await?;
        }

        match classify_errors(&errors) {
            ErrorVerdict::Clean => Ok(false),
            ErrorVerdict::SkipAcceptable => {
                info!("Only location-type validation errors remain, continuing");
                Ok(true)
            }
            ErrorVerdict::Blocking(blocking) => {
                Err(PunchError::ValidationFailed(blocking.join("; ")))
            }
        }
    }

    /// Save-and-proceed, then submit on the confirmation screen
    async fn advance(&self) -> Result<()> {
        let timeout = self.element_timeout();
        let page_timeout = Duration::from_secs(self.config.page_load_timeout_secs);

        let next = resolver::resolve(self.session, FieldRole::NextButton, timeout).await?;
        dom::click(self.session, &next).await?;
        self.session.wait_for_page_load(page_timeout).await?;

        let submit = resolver::resolve(self.session, FieldRole::SubmitButton, timeout).await?;
        dom::click(self.session, &submit).await?;
        self.session.wait_for_page_load(page_timeout).await?;
        info!("Day submitted");
        Ok(())
    }
}

/// Whether a validation message is the night-work application error
pub fn is_night_work_error(text: &str) -> bool {
    text.contains("深夜勤務申請") || text.to_lowercase().contains("night work")
}

/// Whether a validation message is the tolerated location-type error
pub fn is_location_type_error(text: &str) -> bool {
    text.contains("在宅/出社区分が入力されていません")
        || text.to_lowercase().contains("location type not entered")
}

/// Classify the full error set per the skip rule: no errors is clean, only
/// location-type errors is acceptable, anything else blocks.
pub fn classify_errors(errors: &[String]) -> ErrorVerdict {
    if errors.is_empty() {
        return ErrorVerdict::Clean;
    }
    let blocking: Vec<String> = errors
        .iter()
        .filter(|e| !is_location_type_error(e))
        .cloned()
        .collect();
    if blocking.is_empty() {
        ErrorVerdict::SkipAcceptable
    } else {
        ErrorVerdict::Blocking(blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn night_work_error_is_detected_by_pattern() {
        assert!(is_night_work_error("深夜勤務申請が提出されていません"));
        assert!(is_night_work_error("Night work application required"));
        assert!(!is_night_work_error("在宅/出社区分が入力されていません"));
    }

    #[test]
    fn no_errors_is_clean() {
        assert_eq!(classify_errors(&[]), ErrorVerdict::Clean);
    }

    #[test]
    fn location_type_only_errors_are_skip_acceptable() {
        let verdict = classify_errors(&errs(&[
            "在宅/出社区分が入力されていません",
            "在宅/出社区分が入力されていません。",
        ]));
        assert_eq!(verdict, ErrorVerdict::SkipAcceptable);
    }

    #[test]
    fn any_other_error_blocks() {
        let verdict = classify_errors(&errs(&[
            "在宅/出社区分が入力されていません",
            "休憩時間が不正です",
        ]));
        match verdict {
            ErrorVerdict::Blocking(blocking) => {
                assert_eq!(blocking, errs(&["休憩時間が不正です"]));
            }
            other => panic!("expected blocking verdict, got {:?}", other),
        }
    }
}
