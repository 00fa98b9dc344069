//! WAC tactical test harness
//!
//! Drives a UCI engine through an EPD suite one position at a time, checks
//! its answers with the lenient move matcher from `epd-core`, records the
//! failures for a later resumed run and offers an interactive retest loop.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod protocol;
pub mod retest;
pub mod run_log;
pub mod runner;

pub use config::HarnessConfig;
pub use engine::{Conversation, EngineSession, LineDirection};
pub use error::{EngineError, HarnessError};
pub use outcome::{FailureReason, RunState, RunSummary, TestOutcome};
pub use protocol::{CommandScript, SearchInfo, SearchLimit};
pub use run_log::RunLog;
pub use runner::{EngineRunner, Evaluator};
