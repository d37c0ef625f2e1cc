//! Application Layer - scheduled jobs built on the domain and ports.

pub mod manual;
pub mod reclassify;
pub mod runner;

pub use manual::{ManualUpdateError, ManualUpdateService};
pub use reclassify::{ReclassifyError, ReclassifyJob, ReclassifySummary};
pub use runner::{HaltReason, RunSummary, RunnerError, RunnerSettings, UpdateRunner};
