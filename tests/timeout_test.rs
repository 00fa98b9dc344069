/// Engine failure handling: hung searches and engines that never start.
mod common;

use std::time::{Duration, Instant};

use epd_core::{Suite, SuiteFilter};
use wac_harness::outcome::FailureReason;
use wac_harness::run_log::RunLog;
use wac_harness::runner::{run_suite, EngineRunner};
use wac_harness::SearchLimit;

#[cfg(unix)]
#[tokio::test]
async fn test_silent_engine_times_out_and_is_reaped() {
    use wac_harness::protocol::CommandScript;
    use wac_harness::{EngineError, EngineSession};

    let dir = common::temp_dir("silent");
    let engine = common::write_stub_engine(&dir, common::SILENT_ENGINE);

    let mut session = EngineSession::start(&engine).unwrap();
    let script = CommandScript::new("8/8/8/8/8/8/8/K6k w - - 0 1", SearchLimit::from_secs(1));
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let result = session.converse(&script, timeout, |_, _| {}).await;
    let elapsed = started.elapsed();

    match result {
        Err(EngineError::Timeout { after, partial }) => {
            assert!(after >= timeout);
            assert!(partial.iter().any(|line| line == ">>> go movetime 1000"));
            assert!(partial.iter().any(|line| line == "<<< info depth 1"));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(elapsed < timeout + Duration::from_secs(2));
    assert!(session.has_exited());

    let transcript = session.shutdown(Duration::from_millis(100), |_, _| {}).await;
    assert!(!transcript.iter().any(|line| line == ">>> quit"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn test_engine_ignoring_quit_is_killed_after_grace() {
    use wac_harness::protocol::CommandScript;
    use wac_harness::EngineSession;

    let dir = common::temp_dir("stubborn");
    let engine = common::write_stub_engine(&dir, common::STUBBORN_ENGINE);

    let mut session = EngineSession::start(&engine).unwrap();
    let pid = session.id().unwrap();
    let script = CommandScript::new("8/8/8/8/8/8/8/K6k w - - 0 1", SearchLimit::from_secs(1));
    let conversation = session
        .converse(&script, Duration::from_secs(5), |_, _| {})
        .await
        .unwrap();
    assert_eq!(conversation.best_move.mv, "e2e4");
    assert!(session.transcript().iter().any(|line| line == "<<< bestmove e2e4"));
    assert!(!session.has_exited());

    let grace = Duration::from_millis(300);
    let started = Instant::now();
    let transcript = session.shutdown(grace, |_, _| {}).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= grace);
    assert!(elapsed < grace + Duration::from_secs(2));
    assert_eq!(transcript.last().map(String::as_str), Some(">>> quit"));
    if cfg!(target_os = "linux") {
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_uciok_times_out() {
    use wac_harness::protocol::CommandScript;
    use wac_harness::{EngineError, EngineSession};

    let dir = common::temp_dir("no-handshake");
    let engine = common::write_stub_engine(&dir, common::NO_HANDSHAKE_ENGINE);

    let mut session = EngineSession::start(&engine).unwrap();
    let script = CommandScript::new("8/8/8/8/8/8/8/K6k w - - 0 1", SearchLimit::from_secs(1));
    let result = session
        .converse(&script, Duration::from_millis(500), |_, _| {})
        .await;

    match result {
        Err(EngineError::Timeout { partial, .. }) => {
            assert_eq!(partial, vec![">>> uci".to_string()]);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(session.has_exited());
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn test_oversized_movetime_does_not_overflow_deadline() {
    use wac_harness::protocol::CommandScript;
    use wac_harness::EngineSession;

    let dir = common::temp_dir("huge-budget");
    let engine = common::write_stub_engine(&dir, common::ANSWERING_ENGINE);

    let limit = SearchLimit::from_secs(u64::MAX / 2);
    let timeout = limit.deadline(Duration::from_secs(10), Duration::from_secs(300));
    let mut session = EngineSession::start(&engine).unwrap();
    let script = CommandScript::new("8/4P3/8/8/8/8/k7/4K3 w - - 0 1", limit);

    let conversation = session.converse(&script, timeout, |_, _| {}).await.unwrap();
    assert_eq!(conversation.best_move.mv, "e7e8q");

    session.shutdown(Duration::from_millis(500), |_, _| {}).await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeouts_do_not_stop_the_run() {
    let dir = common::temp_dir("hung-run");
    let suite_path = common::write_suite(&dir, common::TACTICS_SUITE);
    let engine = common::write_stub_engine(&dir, common::SILENT_ENGINE);
    let config = common::config_for(&engine, &dir);

    let suite = Suite::open(&suite_path).unwrap();
    let positions = suite.positions(&SuiteFilter::default());
    let runner = EngineRunner::new(&config);
    let mut log = RunLog::create_in(&dir, "wac_test_log").unwrap();

    let started = Instant::now();
    let state = run_suite(&runner, &positions, SearchLimit::from_secs(1), &mut log).await;

    assert_eq!(state.len(), 2);
    assert_eq!(state.failed_indices(), vec![0, 1]);
    for outcome in state.outcomes() {
        assert_eq!(outcome.failure, Some(FailureReason::Timeout));
        assert_eq!(outcome.engine_move, None);
        assert!(!outcome.transcript.is_empty());
    }
    // movetime 1s + 1s grace per position, plus slack
    assert!(started.elapsed() < Duration::from_secs(8));

    log.flush();
    let text = std::fs::read_to_string(log.path()).unwrap();
    assert!(text.contains("Cause: Timeout"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_missing_engine_recorded_as_failure() {
    let dir = common::temp_dir("no-engine");
    let suite_path = common::write_suite(&dir, common::TACTICS_SUITE);
    let config = common::config_for(&dir.join("no-such-engine"), &dir);

    let suite = Suite::open(&suite_path).unwrap();
    let positions = suite.positions(&SuiteFilter::default());
    let runner = EngineRunner::new(&config);
    let mut log = RunLog::create_in(&dir, "wac_test_log").unwrap();

    let state = run_suite(&runner, &positions, SearchLimit::from_secs(1), &mut log).await;

    assert_eq!(state.len(), 2);
    assert!(state
        .outcomes()
        .iter()
        .all(|o| matches!(o.failure, Some(FailureReason::Spawn(_)))));
    let summary = state.summary();
    assert_eq!(summary.passed + summary.failed, summary.total);
    let _ = std::fs::remove_dir_all(&dir);
}
