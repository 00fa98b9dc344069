//! WAC test suite runner
//!
//! Tests the engine on the first N positions of the suite (or on the lines
//! listed in a failed positions file), writes a detailed log, and offers an
//! interactive retest of whatever failed.

use std::io::{self, BufRead, Write};

use clap::Parser;
use epd_core::Suite;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wac_harness::cli::Args;
use wac_harness::config::HarnessConfig;
use wac_harness::retest::machine::parse_confirmation;
use wac_harness::retest::{RetestController, RetestShell};
use wac_harness::run_log::RunLog;
use wac_harness::runner::{
    persist_failures, report_summary, run_suite, write_json_report, EngineRunner,
};

/// Ask on stdin whether to enter retest mode.
fn offer_retest() -> io::Result<bool> {
    print!("\nSome positions failed. Enter interactive retest mode? (y/n): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_confirmation(&answer))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    args.validate()?;

    let mut config = HarnessConfig::from_env()?;
    args.apply(&mut config);

    let suite = Suite::open(&config.suite_path)?;
    if suite.is_empty() {
        anyhow::bail!("No positions found in {}", suite.path().display());
    }
    let filter = args.suite_filter(suite.len())?;
    let positions = suite.positions(&filter);
    let limit = args.search_limit();
    info!(
        suite = %suite.path().display(),
        available = suite.len(),
        selected = positions.len(),
        "Suite loaded"
    );

    let runner = EngineRunner::new(&config).with_options(args.options.clone());

    println!("WAC Test Suite");
    println!("Engine: {}", runner.engine_path().display());
    println!("Search: {} per position", limit.describe());
    match &args.failed_file {
        Some(path) => println!(
            "Retesting {} failed positions from {}",
            positions.len(),
            path.display()
        ),
        None => println!("Testing {} positions", positions.len()),
    }

    let mut log = RunLog::create_in(&config.output_dir, "wac_test_log")?;
    log.header(
        "WAC Test Suite Log",
        &[
            format!("Engine: {}", runner.engine_path().display()),
            format!("Suite: {}", suite.path().display()),
            format!("Search: {}", limit.describe()),
            format!("Match policy: {:?}", runner.policy()),
            format!("Testing {} positions", positions.len()),
        ],
    );

    let mut state = run_suite(&runner, &positions, limit, &mut log).await;
    report_summary(&state, &mut log);

    if let Some(path) = persist_failures(&state, &suite, &config.output_dir)? {
        println!("\nFailed positions saved to: {}", path.display());
        println!("To retest only these, run: wac-harness --failed-file {}", path.display());
        log.blank();
        log.line(format!("Failed positions saved to: {}", path.display()));
    }

    if let Some(path) = &args.json_out {
        write_json_report(&state, limit, runner.policy(), path)?;
        println!("JSON report written to: {}", path.display());
    }

    log.flush();
    println!("\nDetailed log saved to: {}", log.path().display());
    drop(log);

    if state.has_failures() && !args.no_retest && offer_retest()? {
        let mut controller = RetestController::new(&mut state, &runner);
        let mut shell =
            RetestShell::new(io::stdin().lock(), io::stdout(), config.output_dir.clone());
        shell.run(&mut controller).await?;
    }

    Ok(())
}
