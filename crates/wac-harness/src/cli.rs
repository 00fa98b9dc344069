//! Command line arguments

use std::path::PathBuf;

use clap::Parser;
use epd_core::{failed_index, MatchPolicy, SuiteFilter};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::protocol::{SearchLimit, MAX_SEARCH_SECS};

#[derive(Parser, Debug)]
#[command(name = "wac-harness")]
#[command(about = "Run the Win At Chess tactical suite against a UCI engine")]
pub struct Args {
    /// Number of positions to test, taken from the start of the suite
    #[arg(default_value_t = 10, conflicts_with = "failed_file")]
    pub positions: usize,

    /// Search time per position in seconds
    #[arg(short, long, default_value_t = 5, conflicts_with = "depth")]
    pub time: u64,

    /// Search to a fixed depth instead of a fixed time
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Retest only the suite lines listed in a failed positions file
    #[arg(long)]
    pub failed_file: Option<PathBuf>,

    /// Engine executable (overrides WAC_ENGINE_PATH)
    #[arg(long)]
    pub engine: Option<PathBuf>,

    /// EPD suite file (overrides WAC_SUITE_PATH)
    #[arg(long)]
    pub suite: Option<PathBuf>,

    /// Directory for logs and failed positions files (overrides WAC_OUTPUT_DIR)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Engine option sent with setoption, e.g. --option Hash=64
    #[arg(long = "option", value_name = "NAME=VALUE", value_parser = parse_engine_option)]
    pub options: Vec<(String, String)>,

    /// Only accept exact or destination-only matches
    #[arg(long)]
    pub strict: bool,

    /// Do not offer interactive retesting after the run
    #[arg(long)]
    pub no_retest: bool,

    /// Also write a JSON report to this path
    #[arg(long)]
    pub json_out: Option<PathBuf>,
}

/// Parse `NAME=VALUE`. The value may be empty, the name may not.
pub fn parse_engine_option(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing option name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl Args {
    /// Checks that need nothing but the arguments themselves.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.depth.is_none() && self.time == 0 {
            return Err(HarnessError::InvalidArgument(
                "Time must be a positive number of seconds".into(),
            ));
        }
        if self.depth.is_none() && self.time > MAX_SEARCH_SECS {
            return Err(HarnessError::InvalidArgument(format!(
                "Time must be at most {MAX_SEARCH_SECS} seconds"
            )));
        }
        if self.depth == Some(0) {
            return Err(HarnessError::InvalidArgument("Depth must be at least 1".into()));
        }
        Ok(())
    }

    /// Apply command line overrides on top of the environment config.
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(engine) = &self.engine {
            config.engine_path = engine.clone();
        }
        if let Some(suite) = &self.suite {
            config.suite_path = suite.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.strict {
            config.match_policy = MatchPolicy::Strict;
        }
    }

    pub fn search_limit(&self) -> SearchLimit {
        match self.depth {
            Some(depth) => SearchLimit::Depth(depth),
            None => SearchLimit::from_secs(self.time),
        }
    }

    /// Which suite positions to run. In resume mode this reads the failed
    /// positions file; otherwise the count is checked against the suite.
    pub fn suite_filter(&self, suite_len: usize) -> Result<SuiteFilter, HarnessError> {
        if let Some(path) = &self.failed_file {
            if !path.is_file() {
                return Err(HarnessError::FailedIndexNotFound(path.clone()));
            }
            let lines = failed_index::read(path)?;
            return Ok(SuiteFilter::Lines(lines));
        }

        if !(1..=suite_len).contains(&self.positions) {
            return Err(HarnessError::InvalidArgument(format!(
                "Number of positions must be between 1 and {suite_len}"
            )));
        }
        Ok(SuiteFilter::All {
            limit: Some(self.positions),
        })
    }
}
