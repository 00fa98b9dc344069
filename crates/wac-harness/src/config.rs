//! Harness configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use epd_core::MatchPolicy;

use crate::error::HarnessError;

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Path to the engine executable
    pub engine_path: PathBuf,

    /// Path to the EPD suite
    pub suite_path: PathBuf,

    /// Directory for run logs, retest logs and failed-index files
    pub output_dir: PathBuf,

    /// Extra time granted over `movetime` before a search counts as hung
    pub timeout_grace: Duration,

    /// Deadline for depth-limited searches
    pub depth_timeout: Duration,

    /// How long to wait for the engine to exit after `quit`
    pub shutdown_grace: Duration,

    /// Destination-square matching policy
    pub match_policy: MatchPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("../build/bin/Release/huginn"),
            suite_path: PathBuf::from("WAC300.epd"),
            output_dir: PathBuf::from("."),
            timeout_grace: Duration::from_secs(10),
            depth_timeout: Duration::from_secs(300),
            shutdown_grace: Duration::from_millis(2000),
            match_policy: MatchPolicy::Lenient,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables. Unset variables take
    /// their defaults; a set but unparsable number is an error.
    pub fn from_env() -> Result<Self, HarnessError> {
        let defaults = Self::default();

        let engine_path = env::var("WAC_ENGINE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.engine_path);

        let suite_path = env::var("WAC_SUITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.suite_path);

        let output_dir = env::var("WAC_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let timeout_grace = number_var(
            "WAC_TIMEOUT_GRACE_SECS",
            "WAC_TIMEOUT_GRACE_SECS must be a whole number of seconds",
        )?
        .map(Duration::from_secs)
        .unwrap_or(defaults.timeout_grace);

        let depth_timeout = number_var(
            "WAC_DEPTH_TIMEOUT_SECS",
            "WAC_DEPTH_TIMEOUT_SECS must be a whole number of seconds",
        )?
        .map(Duration::from_secs)
        .unwrap_or(defaults.depth_timeout);

        let shutdown_grace = number_var(
            "WAC_SHUTDOWN_GRACE_MS",
            "WAC_SHUTDOWN_GRACE_MS must be a whole number of milliseconds",
        )?
        .map(Duration::from_millis)
        .unwrap_or(defaults.shutdown_grace);

        let match_policy = match env::var("WAC_STRICT_MATCH").as_deref() {
            Ok("1") | Ok("true") | Ok("yes") => MatchPolicy::Strict,
            _ => defaults.match_policy,
        };

        if depth_timeout.is_zero() {
            return Err(HarnessError::Config("WAC_DEPTH_TIMEOUT_SECS must be positive"));
        }

        Ok(Self {
            engine_path,
            suite_path,
            output_dir,
            timeout_grace,
            depth_timeout,
            shutdown_grace,
            match_policy,
        })
    }
}

fn number_var(name: &str, message: &'static str) -> Result<Option<u64>, HarnessError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HarnessError::Config(message)),
        Err(_) => Ok(None),
    }
}
