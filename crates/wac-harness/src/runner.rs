//! Test run controller: positions in, outcomes out.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use epd_core::{failed_index, moves_match, MatchPolicy, Position, Suite};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::engine::{Conversation, EngineSession, LineDirection};
use crate::error::{EngineError, HarnessError};
use crate::outcome::{FailureReason, RunState, RunSummary, TestOutcome};
use crate::protocol::{CommandScript, SearchInfo, SearchLimit};
use crate::run_log::{file_timestamp, RunLog};

/// Something that can produce an outcome for one position.
///
/// `EngineRunner` is the real implementation; the retest controller and
/// tests are generic over it.
pub trait Evaluator {
    fn evaluate(
        &self,
        position: &Position,
        limit: SearchLimit,
        log: &mut RunLog,
    ) -> impl Future<Output = TestOutcome>;
}

/// Evaluates positions with a fresh engine process each.
#[derive(Debug, Clone)]
pub struct EngineRunner {
    engine_path: PathBuf,
    options: Vec<(String, String)>,
    timeout_grace: Duration,
    depth_timeout: Duration,
    shutdown_grace: Duration,
    policy: MatchPolicy,
}

impl EngineRunner {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            engine_path: config.engine_path.clone(),
            options: Vec::new(),
            timeout_grace: config.timeout_grace,
            depth_timeout: config.depth_timeout,
            shutdown_grace: config.shutdown_grace,
            policy: config.match_policy,
        }
    }

    /// Engine options sent as `setoption` after the handshake.
    pub fn with_options(mut self, options: Vec<(String, String)>) -> Self {
        self.options = options;
        self
    }

    pub fn engine_path(&self) -> &Path {
        &self.engine_path
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Spawn, converse, always shut down. Returns the conversation result
    /// and everything that was exchanged.
    async fn converse(
        &self,
        position: &Position,
        limit: SearchLimit,
        log: &mut RunLog,
    ) -> (Result<Conversation, EngineError>, Vec<String>) {
        let mut session = match EngineSession::start(&self.engine_path) {
            Ok(session) => session,
            Err(e) => return (Err(e), Vec::new()),
        };

        let script =
            CommandScript::new(position.fen.as_str(), limit).with_options(self.options.clone());
        let timeout = limit.deadline(self.timeout_grace, self.depth_timeout);

        let result = session
            .converse(&script, timeout, |direction, line| stream_line(log, direction, line))
            .await;
        let transcript = session
            .shutdown(self.shutdown_grace, |direction, line| stream_line(log, direction, line))
            .await;

        (result, transcript)
    }

    /// Test the engine on a single position.
    pub async fn test_position(
        &self,
        position: &Position,
        limit: SearchLimit,
        log: &mut RunLog,
    ) -> TestOutcome {
        println!("\nTesting {}", position.id);
        println!("FEN: {}", position.fen);
        println!("Expected: {}", position.expected());

        log.blank();
        log.rule();
        log.line(format!("Testing {}", position.id));
        log.line(format!("FEN: {}", position.fen));
        log.line(format!("Expected best moves: {}", position.expected()));
        log.rule();

        let started = Instant::now();
        let (result, transcript) = self.converse(position, limit, log).await;

        let mut outcome = match result {
            Ok(conversation) => {
                let mv = conversation.best_move.mv;
                let succeeded = moves_match(&mv, &position.best_moves, self.policy);
                TestOutcome {
                    position: position.clone(),
                    engine_move: Some(mv),
                    succeeded,
                    transcript,
                    failure: None,
                    info: conversation.info,
                    elapsed: Duration::ZERO,
                }
            }
            Err(e) => {
                println!("ERROR: {e}");
                log.line(format!("ERROR: {e}"));
                TestOutcome::failed(position.clone(), FailureReason::from(&e), transcript)
            }
        };
        outcome.elapsed = started.elapsed();

        report_outcome(&outcome, log);
        outcome
    }
}

impl Evaluator for EngineRunner {
    async fn evaluate(
        &self,
        position: &Position,
        limit: SearchLimit,
        log: &mut RunLog,
    ) -> TestOutcome {
        self.test_position(position, limit, log).await
    }
}

/// Stream one protocol line to the run log (and echo engine output).
fn stream_line(log: &mut RunLog, direction: LineDirection, line: &str) {
    match direction {
        LineDirection::Sent => log.line(format!(">>> {line}")),
        LineDirection::Received => {
            if !line.is_empty() {
                println!("Engine: {line}");
                log.line(format!("<<< {line}"));
            }
        }
    }
}

fn describe_search(info: &SearchInfo) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(depth) = info.depth {
        parts.push(format!("depth {depth}"));
    }
    if let Some(score) = info.score {
        parts.push(format!("score {score}"));
    }
    if let Some(nodes) = info.nodes {
        parts.push(format!("nodes {nodes}"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn report_outcome(outcome: &TestOutcome, log: &mut RunLog) {
    let status = outcome.status();
    println!("Engine played: {}", outcome.engine_move_display());
    if let Some(search) = outcome.info.as_ref().and_then(describe_search) {
        println!("Search: {search}");
    }
    println!("Result: {status}");

    log.blank();
    log.line(format!("RESULT: {status}"));
    log.line(format!("Engine move: {}", outcome.engine_move_display()));
    log.line(format!("Expected: {}", outcome.position.expected()));
    if let Some(search) = outcome.info.as_ref().and_then(describe_search) {
        log.line(format!("Search: {search}"));
    }
    if let Some(reason) = &outcome.failure {
        log.line(format!("Cause: {reason}"));
    }
}

/// Evaluate every position in order and collect the outcomes.
pub async fn run_suite<E: Evaluator>(
    evaluator: &E,
    positions: &[Position],
    limit: SearchLimit,
    log: &mut RunLog,
) -> RunState {
    let mut state = RunState::new();
    let total = positions.len();
    let start = Instant::now();
    info!(total, limit = %limit.describe(), "Starting test run");

    for (i, position) in positions.iter().enumerate() {
        let done = i + 1;
        println!("\n{}", "=".repeat(60));
        println!("Position {done}/{total}");

        let outcome = evaluator.evaluate(position, limit, log).await;
        state.push(outcome);

        let elapsed = start.elapsed().as_secs_f64();
        let eta = elapsed / done as f64 * (total - done) as f64;
        println!("Elapsed: {elapsed:.1}s, ETA: {eta:.1}s");
    }

    let summary = state.summary();
    info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        "Test run finished"
    );
    state
}

/// Print and log the end-of-run summary with the list of failures.
pub fn report_summary(state: &RunState, log: &mut RunLog) -> RunSummary {
    let summary = state.summary();

    println!("\n{}", "=".repeat(60));
    println!("WAC TEST SUITE SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total positions: {}", summary.total);
    println!("Passed: {}", summary.passed);
    println!("Failed: {}", summary.failed);
    println!("Success rate: {}", summary.success_rate_display());

    log.blank();
    log.rule();
    log.line("FINAL SUMMARY");
    log.rule();
    log.line(format!("Total positions: {}", summary.total));
    log.line(format!("Passed: {}", summary.passed));
    log.line(format!("Failed: {}", summary.failed));
    log.line(format!("Success rate: {}", summary.success_rate_display()));

    if state.has_failures() {
        println!("\nFAILED POSITIONS:");
        println!("{}", "-".repeat(40));
        log.blank();
        log.line("FAILED POSITIONS:");
        for (n, index) in state.failed_indices().into_iter().enumerate() {
            let Some(outcome) = state.get(index) else { continue };
            let line = failure_line(outcome);
            println!("{}. {line}", n + 1);
            log.line(line);
        }
    }

    summary
}

/// `id: Expected ..., got ...` with the failure cause when there is one.
pub fn failure_line(outcome: &TestOutcome) -> String {
    let mut line = format!(
        "{}: Expected {}, got {}",
        outcome.position.id,
        outcome.position.expected(),
        outcome.engine_move_display()
    );
    if let Some(reason) = &outcome.failure {
        line.push_str(&format!(" ({reason})"));
    }
    line
}

/// Write the failed positions' suite line numbers so a later run can
/// resume with `--failed-file`. Returns the file path, or `None` when
/// nothing failed.
pub fn persist_failures(
    state: &RunState,
    suite: &Suite,
    dir: &Path,
) -> Result<Option<PathBuf>, HarnessError> {
    if !state.has_failures() {
        return Ok(None);
    }

    let mut lines = Vec::new();
    for index in state.failed_indices() {
        let Some(outcome) = state.get(index) else { continue };
        match suite.locate_line(&outcome.position) {
            Some(line) => lines.push(line),
            None => warn!(
                id = %outcome.position.id,
                "Failed position not found in suite, not persisted"
            ),
        }
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("wac_failed_positions_{}.txt", file_timestamp()));
    failed_index::write(&path, &lines)?;
    info!(path = %path.display(), count = lines.len(), "Failed positions saved");
    Ok(Some(path))
}

#[derive(Serialize)]
struct OutcomeRecord<'a> {
    id: &'a str,
    fen: &'a str,
    expected: &'a [String],
    engine_move: Option<&'a str>,
    succeeded: bool,
    failure: Option<&'a FailureReason>,
    search: Option<&'a SearchInfo>,
    elapsed_ms: u64,
}

#[derive(Serialize)]
struct RunReport<'a> {
    summary: RunSummary,
    search: String,
    policy: MatchPolicy,
    results: Vec<OutcomeRecord<'a>>,
}

/// Write a machine-readable JSON report of the run.
pub fn write_json_report(
    state: &RunState,
    limit: SearchLimit,
    policy: MatchPolicy,
    path: &Path,
) -> Result<(), HarnessError> {
    let report = RunReport {
        summary: state.summary(),
        search: limit.describe(),
        policy,
        results: state
            .outcomes()
            .iter()
            .map(|o| OutcomeRecord {
                id: &o.position.id,
                fen: &o.position.fen,
                expected: &o.position.best_moves,
                engine_move: o.engine_move.as_deref(),
                succeeded: o.succeeded,
                failure: o.failure.as_ref(),
                search: o.info.as_ref(),
                elapsed_ms: o.elapsed.as_millis() as u64,
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json)?;
    Ok(())
}
