/// End-to-end runs against a scripted stub engine.
///
/// The stub answers `b3b2` for T1 (`bm Rxb2`) and `e7e8q` for T2
/// (`bm e8=Q`). T1 only matches through the trailing-square fallback, so
/// the result depends on the matching policy; T2 matches either way.
#[cfg(unix)]
mod common;

#[cfg(unix)]
mod unix {
    use epd_core::{MatchPolicy, Suite, SuiteFilter};
    use wac_harness::run_log::RunLog;
    use wac_harness::runner::{report_summary, run_suite, EngineRunner};
    use wac_harness::{RunState, SearchLimit};

    use super::common;

    async fn run_with_policy(policy: MatchPolicy, tag: &str) -> (RunState, String) {
        let dir = common::temp_dir(tag);
        let suite_path = common::write_suite(&dir, common::TACTICS_SUITE);
        let engine = common::write_stub_engine(&dir, common::ANSWERING_ENGINE);
        let mut config = common::config_for(&engine, &dir);
        config.match_policy = policy;

        let suite = Suite::open(&suite_path).unwrap();
        let positions = suite.positions(&SuiteFilter::default());
        assert_eq!(positions.len(), 2);

        let runner = EngineRunner::new(&config)
            .with_options(vec![("Hash".to_string(), "16".to_string())]);
        let mut log = RunLog::create_in(&dir, "wac_test_log").unwrap();
        let state = run_suite(&runner, &positions, SearchLimit::from_secs(1), &mut log).await;
        report_summary(&state, &mut log);
        log.flush();

        let text = std::fs::read_to_string(log.path()).unwrap();
        drop(log);
        let _ = std::fs::remove_dir_all(&dir);
        (state, text)
    }

    #[tokio::test]
    async fn test_lenient_policy_passes_both() {
        let (state, log) = run_with_policy(MatchPolicy::Lenient, "lenient").await;

        let outcomes = state.outcomes();
        assert_eq!(outcomes[0].position.id, "T1");
        assert_eq!(outcomes[0].engine_move.as_deref(), Some("b3b2"));
        assert!(outcomes[0].succeeded);
        assert_eq!(outcomes[1].engine_move.as_deref(), Some("e7e8q"));
        assert!(outcomes[1].succeeded);
        assert!(!state.has_failures());

        let info = outcomes[0].info.as_ref().unwrap();
        assert_eq!(info.depth, Some(4));
        assert_eq!(info.pv, vec!["b3b2".to_string()]);

        assert!(log.contains(">>> uci"));
        assert!(log.contains(">>> setoption name Hash value 16"));
        assert!(log.contains(">>> go movetime 1000"));
        assert!(log.contains("<<< bestmove b3b2"));
        assert!(log.contains(">>> quit"));
        assert!(log.contains("RESULT: PASS"));
        assert!(log.contains("Success rate: 100.0%"));
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_trailing_square() {
        let (state, log) = run_with_policy(MatchPolicy::Strict, "strict").await;

        assert_eq!(state.failed_indices(), vec![0]);
        assert!(state.get(1).unwrap().succeeded);
        let summary = state.summary();
        assert_eq!((summary.total, summary.passed, summary.failed), (2, 1, 1));
        assert!(log.contains("T1: Expected Rxb2, got b3b2"));
    }

    #[tokio::test]
    async fn test_transcript_kept_per_outcome() {
        let (state, _) = run_with_policy(MatchPolicy::Lenient, "transcript").await;

        let transcript = &state.get(1).unwrap().transcript;
        assert_eq!(transcript.first().map(String::as_str), Some(">>> uci"));
        assert!(transcript
            .iter()
            .any(|line| line == ">>> position fen 8/4P3/8/8/8/8/k7/4K3 w - - 0 1"));
        assert!(transcript.iter().any(|line| line == "<<< bestmove e7e8q"));
    }
}
