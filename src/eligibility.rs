//! Appeal window eligibility check
//!
//! Decides whether a denied claim can still be appealed: the appeal window
//! runs a fixed number of days (180 by default) from the denial date, and
//! the deadline day itself is still inside the window.
//!
//! The current date comes from a [`Clock`] so the check stays a pure
//! function of its inputs under test.

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default length of the appeal window in days
pub const DEFAULT_APPEAL_WINDOW_DAYS: u64 = 180;

/// Wire format accepted for denial dates
pub const DENIAL_DATE_FORMAT: &str = "%Y-%m-%d";

const ELIGIBLE_MESSAGE: &str = "Eligible. Proceed with data collection.";
const WARNING_MESSAGE: &str = "Date format error. Please check the date and proceed with caution.";

/// Source of "today" for eligibility decisions
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the host's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Outcome category of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    Warning,
}

impl EligibilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityStatus::Eligible => "eligible",
            EligibilityStatus::Ineligible => "ineligible",
            EligibilityStatus::Warning => "warning",
        }
    }
}

impl std::fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{status, message}` pair returned to the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub status: EligibilityStatus,
    pub message: String,
}

impl EligibilityResult {
    fn eligible() -> Self {
        Self {
            status: EligibilityStatus::Eligible,
            message: ELIGIBLE_MESSAGE.to_string(),
        }
    }

    fn ineligible(deadline: NaiveDate) -> Self {
        Self {
            status: EligibilityStatus::Ineligible,
            message: format!(
                "Deadline passed on {}.",
                deadline.format(DENIAL_DATE_FORMAT)
            ),
        }
    }

    fn warning() -> Self {
        Self {
            status: EligibilityStatus::Warning,
            message: WARNING_MESSAGE.to_string(),
        }
    }
}

/// Checks denial dates against the appeal window
#[derive(Clone)]
pub struct EligibilityChecker {
    window_days: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EligibilityChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EligibilityChecker")
            .field("window_days", &self.window_days)
            .field("today", &self.clock.today())
            .finish()
    }
}

impl Default for EligibilityChecker {
    fn default() -> Self {
        Self::new(DEFAULT_APPEAL_WINDOW_DAYS, Arc::new(SystemClock))
    }
}

impl EligibilityChecker {
    pub fn new(window_days: u64, clock: Arc<dyn Clock>) -> Self {
        Self { window_days, clock }
    }

    /// Checker with the default window and a fixed "today"
    pub fn fixed(today: NaiveDate) -> Self {
        Self::new(DEFAULT_APPEAL_WINDOW_DAYS, Arc::new(FixedClock(today)))
    }

    pub fn window_days(&self) -> u64 {
        self.window_days
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Run the check against the injected clock
    pub fn check(&self, date_of_denial: &str) -> EligibilityResult {
        check_on(date_of_denial, self.clock.today(), self.window_days)
    }
}

/// Strict `YYYY-MM-DD` parse; chrono alone accepts unpadded fields
pub fn parse_denial_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(input, DENIAL_DATE_FORMAT).ok()
}

/// Deadline for a denial date, `None` when it falls off the calendar
pub fn appeal_deadline(denial: NaiveDate, window_days: u64) -> Option<NaiveDate> {
    denial.checked_add_days(Days::new(window_days))
}

/// Pure eligibility decision for a given "today"
pub fn check_on(date_of_denial: &str, today: NaiveDate, window_days: u64) -> EligibilityResult {
    let Some(deadline) = parse_denial_date(date_of_denial)
        .and_then(|denial| appeal_deadline(denial, window_days))
    else {
        return EligibilityResult::warning();
    };

    if today > deadline {
        EligibilityResult::ineligible(deadline)
    } else {
        EligibilityResult::eligible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DENIAL_DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_old_denial_is_ineligible_with_deadline_in_message() {
        let result = check_on("2020-01-01", date("2026-10-19"), 180);
        assert_eq!(result.status, EligibilityStatus::Ineligible);
        assert!(result.message.contains("2020-06-29"));
        assert_eq!(result.message, "Deadline passed on 2020-06-29.");
    }

    #[test]
    fn test_denial_today_is_eligible() {
        let today = date("2026-10-19");
        let result = check_on("2026-10-19", today, 180);
        assert_eq!(result.status, EligibilityStatus::Eligible);
        assert_eq!(result.message, ELIGIBLE_MESSAGE);
    }

    #[test]
    fn test_deadline_day_is_inclusive() {
        let today = date("2026-10-19");
        let denial = today - Days::new(180);
        let result = check_on(&denial.format(DENIAL_DATE_FORMAT).to_string(), today, 180);
        assert_eq!(result.status, EligibilityStatus::Eligible);

        let one_more = today - Days::new(181);
        let result = check_on(&one_more.format(DENIAL_DATE_FORMAT).to_string(), today, 180);
        assert_eq!(result.status, EligibilityStatus::Ineligible);
    }

    #[test]
    fn test_malformed_dates_warn() {
        let today = date("2026-10-19");
        for input in [
            "not-a-date",
            "10/20/2025",
            "2025-13-01",
            "",
            "2025-02-30",
            "2025-1-05",
            " 2025-01-05",
            "2025-01-05 ",
            "2025-01-05T00:00:00",
        ] {
            let result = check_on(input, today, 180);
            assert_eq!(result.status, EligibilityStatus::Warning, "input: {input:?}");
            assert_eq!(result.message, WARNING_MESSAGE);
        }
    }

    #[test]
    fn test_future_denial_date_is_eligible() {
        let result = check_on("2027-01-01", date("2026-10-19"), 180);
        assert_eq!(result.status, EligibilityStatus::Eligible);
    }

    #[test]
    fn test_leap_day_parses() {
        assert_eq!(parse_denial_date("2024-02-29"), Some(date("2024-02-29")));
        assert_eq!(parse_denial_date("2023-02-29"), None);
    }

    #[test]
    fn test_custom_window() {
        let today = date("2026-10-19");
        let result = check_on("2026-09-01", today, 30);
        assert_eq!(result.status, EligibilityStatus::Ineligible);
        assert_eq!(result.message, "Deadline passed on 2026-10-01.");
    }

    #[test]
    fn test_checker_uses_injected_clock() {
        let checker = EligibilityChecker::fixed(date("2020-03-01"));
        assert_eq!(checker.window_days(), DEFAULT_APPEAL_WINDOW_DAYS);
        assert_eq!(
            checker.check("2020-01-01").status,
            EligibilityStatus::Eligible
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(EligibilityResult::warning()).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(EligibilityStatus::Ineligible.to_string(), "ineligible");
    }
}
