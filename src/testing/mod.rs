//! Testing utilities and mock implementations
//!
//! Lets agents, the pipeline and the coordinator run without a model
//! endpoint.

pub mod mocks;

pub use mocks::*;

use chrono::NaiveDate;

/// Calendar date for tests; panics on an invalid date
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid test date {year}-{month}-{day}"))
}
