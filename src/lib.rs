//! Claim Ally - insurance claim appeal assistant
//!
//! Helps a user appeal a denied health insurance claim:
//!
//! - checks whether the 180-day appeal window is still open
//!   ([`eligibility`]);
//! - drafts an appeal letter with a five-role model pipeline: research,
//!   letter writing, a bounded review/refine loop and final presentation
//!   ([`agent::AppealPipeline`]);
//! - drives the conversation with a root coordinator that calls the
//!   eligibility check and the pipeline as tools
//!   ([`agent::RootCoordinator`]).
//!
//! # Quick Start
//!
//! ```rust
//! use claim_ally::eligibility::{check_on, EligibilityStatus};
//! use chrono::NaiveDate;
//!
//! let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! let result = check_on("2020-01-01", today, 180);
//!
//! assert_eq!(result.status, EligibilityStatus::Ineligible);
//! assert_eq!(result.message, "Deadline passed on 2020-06-29.");
//! ```

pub mod agent;
pub mod app;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod llm;
pub mod observability;
pub mod session;
pub mod testing;
pub mod tools;

pub use agent::{Agent, AgentOutcome, AppealPipeline, InvocationContext, RootCoordinator};
pub use app::{ClaimAlly, Draft};
pub use config::{AppConfig, ConfigError};
pub use eligibility::{EligibilityChecker, EligibilityResult, EligibilityStatus};
pub use error::{AppealError, AppealResult};
pub use session::{Session, SessionState};
pub use tools::{Tool, ToolDescription, ToolError, ToolSystem};
