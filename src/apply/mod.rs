//! Application dispatch: task text, the Browser Use client and a dry-run stand-in

pub mod browser_use;
pub mod dispatcher;
pub mod task;

pub use browser_use::BrowserUseDispatcher;
pub use dispatcher::{ApplicationDispatcher, ApplicationReceipt, DryRunDispatcher, JobSummary};
