//! Per-position outcomes and the run-wide result set.

use std::collections::BTreeSet;
use std::time::Duration;

use epd_core::Position;
use serde::Serialize;

use crate::error::EngineError;
use crate::protocol::SearchInfo;

/// Why a position failed without a usable engine answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    Timeout,
    Spawn(String),
    Protocol(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "Timeout"),
            FailureReason::Spawn(msg) => write!(f, "Spawn error: {msg}"),
            FailureReason::Protocol(msg) => write!(f, "Protocol error: {msg}"),
        }
    }
}

impl From<&EngineError> for FailureReason {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Spawn(msg) => FailureReason::Spawn(msg.clone()),
            EngineError::Timeout { .. } => FailureReason::Timeout,
            EngineError::Protocol(msg) | EngineError::Io(msg) => {
                FailureReason::Protocol(msg.clone())
            }
        }
    }
}

/// Result of testing one position.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub position: Position,
    pub engine_move: Option<String>,
    pub succeeded: bool,
    /// Every protocol line exchanged, `>>>`/`<<<` prefixed
    pub transcript: Vec<String>,
    pub failure: Option<FailureReason>,
    pub info: Option<SearchInfo>,
    pub elapsed: Duration,
}

impl TestOutcome {
    pub fn failed(position: Position, reason: FailureReason, transcript: Vec<String>) -> Self {
        Self {
            position,
            engine_move: None,
            succeeded: false,
            transcript,
            failure: Some(reason),
            info: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn engine_move_display(&self) -> &str {
        self.engine_move.as_deref().unwrap_or("None")
    }

    pub fn status(&self) -> &'static str {
        if self.succeeded {
            "PASS"
        } else {
            "FAIL"
        }
    }
}

/// Pass/fail totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Percentage of passed positions; `None` for an empty run.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.passed as f64 / self.total as f64 * 100.0)
    }

    pub fn success_rate_display(&self) -> String {
        match self.success_rate() {
            Some(rate) => format!("{rate:.1}%"),
            None => "n/a".to_string(),
        }
    }
}

/// All outcomes of a run, in evaluation order, plus the failed subset.
///
/// Indices are stable: outcomes are only ever replaced. An index is in the
/// failed set exactly when its outcome has `succeeded == false`.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    outcomes: Vec<TestOutcome>,
    failed: BTreeSet<usize>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: TestOutcome) -> usize {
        let index = self.outcomes.len();
        if !outcome.succeeded {
            self.failed.insert(index);
        }
        self.outcomes.push(outcome);
        index
    }

    /// Replace the outcome at `index`, keeping the failed set in step.
    pub fn replace(&mut self, index: usize, outcome: TestOutcome) -> Option<TestOutcome> {
        let slot = self.outcomes.get_mut(index)?;
        if outcome.succeeded {
            self.failed.remove(&index);
        } else {
            self.failed.insert(index);
        }
        Some(std::mem::replace(slot, outcome))
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn get(&self, index: usize) -> Option<&TestOutcome> {
        self.outcomes.get(index)
    }

    /// Failed indices in evaluation order.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().copied().collect()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let total = self.outcomes.len();
        let failed = self.failed.len();
        RunSummary {
            total,
            passed: total - failed,
            failed,
        }
    }

    /// Check the failed-set invariant.
    pub fn is_consistent(&self) -> bool {
        self.outcomes
            .iter()
            .enumerate()
            .all(|(i, o)| o.succeeded != self.failed.contains(&i))
    }
}
