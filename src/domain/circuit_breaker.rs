//! Circuit Breaker & Deadline Guard
//!
//! Run-local polling protection. The breaker counts critical exceptions from
//! the external market API and opens once the configured threshold is
//! reached; the deadline guard bounds one scheduled run's wall-clock time.
//! Both end the run early and leave already-completed merges in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default critical-exception count that opens the breaker.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 10;

#[derive(Error, Debug, Clone)]
pub enum BreakerError {
    #[error("circuit breaker open: {0} critical exceptions recorded (threshold {1})")]
    Open(u32, u32),
}

/// Failure shape of one recorded exception, per the market API taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// The API explicitly rejected the session.
    Rejected,
    /// The API returned a populated error field.
    ApiError,
    /// The API returned a null or empty payload.
    EmptyResponse,
    /// Timeout or connection failure before any payload arrived.
    Transport,
}

/// One recorded exception with enough context for later inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub kind: ExceptionKind,
    pub message: String,
    /// "{item} : ({server}) {server_name} - {data_center}"
    pub context: String,
    pub at: u64,
}

/// Counts critical exceptions for one run and opens at a threshold.
///
/// Transport and protocol failures are not distinguished here; every record
/// counts toward the threshold. Records stay queryable after the run.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    exceptions: Vec<ExceptionRecord>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            exceptions: Vec::new(),
        }
    }

    /// Record one exception and count it toward the threshold.
    pub fn record(
        &mut self,
        kind: ExceptionKind,
        message: impl Into<String>,
        context: impl Into<String>,
        at: u64,
    ) {
        let record = ExceptionRecord {
            kind,
            message: message.into(),
            context: context.into(),
            at,
        };
        tracing::warn!(
            kind = ?record.kind,
            context = %record.context,
            "market api exception: {}",
            record.message
        );
        self.exceptions.push(record);
    }

    pub fn critical_count(&self) -> u32 {
        self.exceptions.len() as u32
    }

    /// True once the run must stop calling the API.
    pub fn is_open(&self) -> bool {
        self.critical_count() >= self.threshold
    }

    /// Operator-visible "system is critical" flag.
    pub fn is_critical(&self) -> bool {
        self.is_open()
    }

    pub fn validate(&self) -> Result<(), BreakerError> {
        if self.is_open() {
            return Err(BreakerError::Open(self.critical_count(), self.threshold));
        }
        Ok(())
    }

    /// All exceptions recorded this run, in order.
    pub fn exceptions(&self) -> &[ExceptionRecord] {
        &self.exceptions
    }
}

/// Wall-clock cutoff for one scheduled run.
///
/// Expiry is a normal termination condition, not an error. The comparison is
/// inclusive so a zero-second budget expires before the first pair is
/// touched.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    deadline: u64,
}

impl DeadlineGuard {
    pub fn new(start: u64, budget_secs: u64) -> Self {
        Self {
            deadline: start.saturating_add(budget_secs),
        }
    }

    pub fn expired(&self, now: u64) -> bool {
        now >= self.deadline
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }
}
