//! Interactive front end for the retest controller.
//!
//! Reads free text, turns it into `MenuCommand`s and budgets, and drives
//! `RetestState`. All decisions live in `machine`; this file only talks.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::error::HarnessError;
use crate::protocol::SearchLimit;
use crate::retest::controller::RetestController;
use crate::retest::machine::{
    parse_budget, parse_confirmation, parse_menu_choice, BudgetChoice, RetestState,
    DEFAULT_BATCH_SECS, DEFAULT_SINGLE_SECS,
};
use crate::run_log::{sanitize_label, RunLog};
use crate::runner::{failure_line, Evaluator};

const HELP: &str = "\
This mode allows you to retest failed positions with custom time controls.

Commands:
  1-N    : Select a specific failed position to retest
  all    : Retest all failed positions with the same time control
  help/h : Show this help message
  quit/q : Exit interactive mode

When retesting:
  - You can specify any search time (in seconds)
  - Longer times may help the engine find the correct move
  - Each retest creates a detailed log file
  - If a position is solved, you can update the main results

Tips:
  - Try 10-30 seconds for tactical positions
  - Some positions may require 60+ seconds for complex tactics
  - The engine shows its thinking process in real-time
  - Check the PV (principal variation) to understand the engine's plan";

pub struct RetestShell<R, W> {
    input: R,
    output: W,
    log_dir: PathBuf,
}

impl<R: BufRead, W: Write> RetestShell<R, W> {
    pub fn new(input: R, output: W, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            input,
            output,
            log_dir: log_dir.into(),
        }
    }

    /// Print `text` and read one line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>, HarnessError> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn banner(&mut self, title: &str) -> Result<(), HarnessError> {
        writeln!(self.output, "\n{}", "=".repeat(60))?;
        writeln!(self.output, "{title}")?;
        writeln!(self.output, "{}", "=".repeat(60))?;
        Ok(())
    }

    /// Run the menu loop until the user quits, input ends, or nothing is
    /// left to retest.
    pub async fn run<E: Evaluator>(
        &mut self,
        controller: &mut RetestController<'_, E>,
    ) -> Result<(), HarnessError> {
        if controller.failed_slots().is_empty() {
            writeln!(self.output, "No failed positions to retest!")?;
            return Ok(());
        }
        self.banner("INTERACTIVE RETEST MODE")?;

        let mut state = RetestState::MenuDisplay;
        while !state.is_done() {
            state = match state {
                RetestState::MenuDisplay => self.menu(controller, state)?,
                RetestState::SingleSelect { slot } => {
                    self.single(controller, slot).await?;
                    state.settle()
                }
                RetestState::BatchAll => {
                    self.batch(controller).await?;
                    state.settle()
                }
                RetestState::Help => {
                    self.banner("INTERACTIVE RETEST MODE - HELP")?;
                    writeln!(self.output, "{HELP}")?;
                    writeln!(self.output, "{}", "=".repeat(60))?;
                    state.settle()
                }
                RetestState::Quit => RetestState::Quit,
            };
        }
        Ok(())
    }

    fn menu<E: Evaluator>(
        &mut self,
        controller: &RetestController<'_, E>,
        state: RetestState,
    ) -> Result<RetestState, HarnessError> {
        let slots = controller.failed_slots();
        if slots.is_empty() {
            writeln!(self.output, "\nAll failed positions now pass!")?;
            return Ok(RetestState::Quit);
        }

        writeln!(self.output, "\nFailed positions available for retesting:")?;
        for (n, index) in slots.iter().enumerate() {
            if let Some(outcome) = controller.state().get(*index) {
                writeln!(self.output, "{}. {}", n + 1, failure_line(outcome))?;
            }
        }
        writeln!(self.output, "\nOptions:")?;
        writeln!(self.output, "  1-{}: Select position to retest", slots.len())?;
        writeln!(self.output, "  'all': Retest all failed positions")?;
        writeln!(self.output, "  'help' or 'h': Show detailed help")?;
        writeln!(self.output, "  'quit' or 'q': Exit interactive mode")?;

        let Some(input) = self.prompt("\nEnter your choice: ")? else {
            return Ok(RetestState::Quit);
        };
        match parse_menu_choice(&input, slots.len()) {
            Ok(command) => Ok(state.next(command)),
            Err(e) => {
                writeln!(self.output, "{e}")?;
                Ok(state)
            }
        }
    }

    /// Ask for a search time until a valid answer arrives.
    fn ask_budget(
        &mut self,
        text: &str,
        default: u64,
        allow_back: bool,
    ) -> Result<Option<u64>, HarnessError> {
        loop {
            let Some(input) = self.prompt(text)? else {
                return Ok(None);
            };
            match parse_budget(&input, default, allow_back) {
                Ok(BudgetChoice::Seconds(secs)) => return Ok(Some(secs)),
                Ok(BudgetChoice::Back) => return Ok(None),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }

    async fn single<E: Evaluator>(
        &mut self,
        controller: &mut RetestController<'_, E>,
        slot: usize,
    ) -> Result<(), HarnessError> {
        let Some(original) = controller
            .failed_slots()
            .get(slot)
            .and_then(|index| controller.state().get(*index))
            .cloned()
        else {
            return Ok(());
        };
        let position = &original.position;

        writeln!(self.output, "\n{}", "=".repeat(50))?;
        writeln!(self.output, "RETESTING: {}", position.id)?;
        writeln!(self.output, "{}", "=".repeat(50))?;
        writeln!(self.output, "FEN: {}", position.fen)?;
        writeln!(self.output, "Expected: {}", position.expected())?;
        writeln!(self.output, "Previous result: {}", original.engine_move_display())?;

        let prompt = format!(
            "\nEnter search time in seconds (default {DEFAULT_SINGLE_SECS}, or 'back' to return): "
        );
        let Some(secs) = self.ask_budget(&prompt, DEFAULT_SINGLE_SECS, true)? else {
            return Ok(());
        };

        writeln!(self.output, "\nRetesting {} with {secs} seconds...", position.id)?;
        let prefix = format!("wac_retest_{}", sanitize_label(&position.id));
        let mut log = RunLog::create_in(&self.log_dir, &prefix)?;
        log.header(
            &format!("WAC Retest - {}", position.id),
            &[format!("Search time: {secs} seconds")],
        );

        let Some(retest) = controller
            .retest_one(slot, SearchLimit::from_secs(secs), &mut log)
            .await
        else {
            return Ok(());
        };

        if retest.outcome.succeeded {
            writeln!(
                self.output,
                "\nSUCCESS! Engine found: {}",
                retest.outcome.engine_move_display()
            )?;
            let answer = self.prompt("Update main test results with this success? (y/n): ")?;
            if answer.as_deref().is_some_and(parse_confirmation) && controller.promote(retest) {
                writeln!(self.output, "Main results updated!")?;
            }
        } else {
            writeln!(
                self.output,
                "\nStill failed. Engine found: {}",
                retest.outcome.engine_move_display()
            )?;
        }

        log.flush();
        writeln!(self.output, "\nDetailed log saved to: {}", log.path().display())?;
        Ok(())
    }

    async fn batch<E: Evaluator>(
        &mut self,
        controller: &mut RetestController<'_, E>,
    ) -> Result<(), HarnessError> {
        let prompt = format!(
            "\nEnter search time in seconds for all positions (default {DEFAULT_BATCH_SECS}): "
        );
        let Some(secs) = self.ask_budget(&prompt, DEFAULT_BATCH_SECS, false)? else {
            return Ok(());
        };

        let count = controller.failed_slots().len();
        writeln!(
            self.output,
            "\nRetesting {count} failed positions with {secs} seconds each..."
        )?;
        writeln!(
            self.output,
            "Estimated time: {:.1} minutes",
            (count as u64).saturating_mul(secs) as f64 / 60.0
        )?;

        let answer = self.prompt("Continue? (y/n): ")?;
        if !answer.as_deref().is_some_and(parse_confirmation) {
            return Ok(());
        }

        let mut log = RunLog::create_in(&self.log_dir, "wac_retest_all")?;
        log.header(
            "WAC Batch Retest",
            &[
                format!("Search time: {secs} seconds per position"),
                format!("Retesting {count} positions"),
            ],
        );

        let tally = controller
            .retest_all(SearchLimit::from_secs(secs), &mut log)
            .await;

        self.banner("RETEST SUMMARY")?;
        writeln!(self.output, "Positions retested: {}", tally.retested)?;
        writeln!(self.output, "New successes: {}", tally.newly_passed)?;
        writeln!(self.output, "Still failing: {}", tally.still_failing)?;

        if tally.newly_passed > 0 {
            let summary = controller.state().summary();
            writeln!(
                self.output,
                "\nUpdated overall success rate: {} ({}/{})",
                summary.success_rate_display(),
                summary.passed,
                summary.total
            )?;
        }

        log.flush();
        writeln!(self.output, "\nDetailed log saved to: {}", log.path().display())?;
        Ok(())
    }
}
