//! Retesting failed positions against a finished run.

use crate::outcome::{RunState, TestOutcome};
use crate::protocol::SearchLimit;
use crate::run_log::RunLog;
use crate::runner::Evaluator;

/// A fresh outcome for one failed position, not yet applied to the run.
#[derive(Debug, Clone)]
pub struct SingleRetest {
    /// Index into the run's outcomes
    pub index: usize,
    pub outcome: TestOutcome,
}

/// Totals for a batch retest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub retested: usize,
    pub newly_passed: usize,
    pub still_failing: usize,
}

/// Re-runs failed positions through an evaluator and promotes successes
/// into the borrowed run state.
pub struct RetestController<'a, E: Evaluator> {
    state: &'a mut RunState,
    evaluator: &'a E,
}

impl<'a, E: Evaluator> RetestController<'a, E> {
    pub fn new(state: &'a mut RunState, evaluator: &'a E) -> Self {
        Self { state, evaluator }
    }

    pub fn state(&self) -> &RunState {
        self.state
    }

    /// Failed outcome indices, in run order. Slot `n` in the menu is
    /// `failed_slots()[n]`.
    pub fn failed_slots(&self) -> Vec<usize> {
        self.state.failed_indices()
    }

    /// Retest the position in menu slot `slot`. The run state is left alone;
    /// call `promote` to apply a success.
    pub async fn retest_one(
        &self,
        slot: usize,
        limit: SearchLimit,
        log: &mut RunLog,
    ) -> Option<SingleRetest> {
        let index = *self.failed_slots().get(slot)?;
        let position = self.state.get(index)?.position.clone();
        let outcome = self.evaluator.evaluate(&position, limit, log).await;
        Some(SingleRetest { index, outcome })
    }

    /// Replace the original outcome with a successful retest. Failed
    /// retests are rejected and leave the original untouched.
    pub fn promote(&mut self, retest: SingleRetest) -> bool {
        if !retest.outcome.succeeded {
            return false;
        }
        self.state.replace(retest.index, retest.outcome).is_some()
    }

    /// Retest every failed position with one shared limit, promoting each
    /// success as soon as it happens.
    ///
    /// The work queue is a snapshot of the failed indices taken up front,
    /// so promotions never disturb positions still waiting their turn.
    pub async fn retest_all(&mut self, limit: SearchLimit, log: &mut RunLog) -> BatchTally {
        let queue = self.failed_slots();
        let total = queue.len();
        let mut tally = BatchTally::default();

        for (n, index) in queue.into_iter().enumerate() {
            let Some(position) = self.state.get(index).map(|o| o.position.clone()) else {
                continue;
            };
            println!("\nRetesting {} ({}/{total})...", position.id, n + 1);

            let outcome = self.evaluator.evaluate(&position, limit, log).await;
            tally.retested += 1;
            if outcome.succeeded {
                println!("SUCCESS! {} now solved!", position.id);
                self.state.replace(index, outcome);
                tally.newly_passed += 1;
            } else {
                println!("{} still failed", position.id);
                tally.still_failing += 1;
            }
        }

        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::tests::outcome;
    use crate::runner::tests::{temp_dir, ScriptedEvaluator};

    fn failing_run() -> RunState {
        let mut state = RunState::new();
        state.push(outcome("T1", false));
        state.push(outcome("T2", true));
        state.push(outcome("T3", false));
        state.push(outcome("T4", false));
        state
    }

    #[tokio::test]
    async fn test_retest_one_does_not_touch_state() {
        let dir = temp_dir("retest-one");
        let mut log = RunLog::create_in(&dir, "retest").unwrap();
        let mut state = failing_run();
        let evaluator = ScriptedEvaluator::new(&[("T3", "a1b2")]);
        let controller = RetestController::new(&mut state, &evaluator);

        let retest = controller
            .retest_one(1, SearchLimit::from_secs(10), &mut log)
            .await
            .unwrap();
        assert_eq!(retest.index, 2);
        assert!(retest.outcome.succeeded);
        assert_eq!(controller.failed_slots(), vec![0, 2, 3]);
        assert!(controller.retest_one(5, SearchLimit::from_secs(10), &mut log).await.is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_promote_only_successes() {
        let dir = temp_dir("promote");
        let mut log = RunLog::create_in(&dir, "retest").unwrap();
        let mut state = failing_run();
        let evaluator = ScriptedEvaluator::new(&[("T1", "a1a2"), ("T4", "a1b2")]);
        let mut controller = RetestController::new(&mut state, &evaluator);

        let still_bad = controller
            .retest_one(0, SearchLimit::from_secs(10), &mut log)
            .await
            .unwrap();
        assert!(!controller.promote(still_bad));
        assert_eq!(controller.failed_slots(), vec![0, 2, 3]);

        let fixed = controller
            .retest_one(2, SearchLimit::from_secs(10), &mut log)
            .await
            .unwrap();
        assert!(controller.promote(fixed));
        assert_eq!(controller.failed_slots(), vec![0, 2]);
        assert!(controller.state().is_consistent());
        assert_eq!(controller.state().get(3).unwrap().engine_move.as_deref(), Some("a1b2"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_retest_all_promotes_and_tallies() {
        let dir = temp_dir("batch");
        let mut log = RunLog::create_in(&dir, "retest_all").unwrap();
        let mut state = failing_run();
        let evaluator = ScriptedEvaluator::new(&[("T1", "a1b2"), ("T4", "a1b2")]);
        let mut controller = RetestController::new(&mut state, &evaluator);

        let tally = controller.retest_all(SearchLimit::from_secs(15), &mut log).await;

        assert_eq!(
            tally,
            BatchTally {
                retested: 3,
                newly_passed: 2,
                still_failing: 1
            }
        );
        assert_eq!(controller.failed_slots(), vec![2]);
        assert!(controller.state().is_consistent());

        let order: Vec<String> = evaluator
            .calls
            .borrow()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        assert_eq!(order, vec!["T1", "T3", "T4"]);
        assert!(evaluator
            .calls
            .borrow()
            .iter()
            .all(|(_, limit)| *limit == SearchLimit::from_secs(15)));

        let summary = state.summary();
        assert_eq!(summary.passed, 3);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
