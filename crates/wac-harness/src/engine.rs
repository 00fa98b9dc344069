//! External engine wrapper using the UCI protocol (async I/O)
//!
//! One `EngineSession` per position: spawned fresh, spoken to once, shut
//! down. Nothing in here knows about chess beyond the UCI line format.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::protocol::{
    parse_bestmove, parse_info, BestMove, CommandScript, SearchInfo, CMD_IS_READY, CMD_NEW_GAME,
    CMD_QUIT, CMD_UCI, MAX_SEARCH_SECS, READY_OK, UCI_OK,
};

/// Fallback deadline when the requested timeout does not fit in an `Instant`.
const LONGEST_CONVERSATION: Duration = Duration::from_secs(2 * MAX_SEARCH_SECS);

/// Which way a transcript line travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Sent,
    Received,
}

/// Result of a conversation that reached `bestmove`.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub best_move: BestMove,
    /// Latest search info seen before `bestmove`
    pub info: Option<SearchInfo>,
}

/// A running engine process
pub struct EngineSession {
    process: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    transcript: Vec<String>,
    started: Option<Instant>,
    deadline: Option<Instant>,
}

/// Resolve the program path and the directory the engine should run in.
fn resolve_program(path: &Path) -> (PathBuf, Option<PathBuf>) {
    match std::fs::canonicalize(path) {
        Ok(full) if full.is_file() => {
            let dir = full.parent().map(Path::to_path_buf);
            (full, dir)
        }
        // Bare names are left for PATH lookup
        _ => (path.to_path_buf(), None),
    }
}

impl EngineSession {
    /// Spawn the engine with piped stdin/stdout.
    pub fn start(path: &Path) -> Result<Self, EngineError> {
        let (program, workdir) = resolve_program(path);

        let mut command = Command::new(&program);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }

        let mut process = command
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", path.display())))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("engine stdin was not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("engine stdout was not captured".into()))?;

        debug!(engine = %program.display(), pid = process.id(), "Engine started");

        Ok(Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            transcript: Vec::new(),
            started: None,
            deadline: None,
        })
    }

    /// OS process id, while the process is alive.
    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Every line sent or received so far, `>>>`/`<<<` prefixed.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn take_transcript(&mut self) -> Vec<String> {
        std::mem::take(&mut self.transcript)
    }

    /// Whether the process has exited and been reaped.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(Some(_)))
    }

    fn record(
        &mut self,
        direction: LineDirection,
        line: &str,
        on_line: &mut impl FnMut(LineDirection, &str),
    ) {
        let prefix = match direction {
            LineDirection::Sent => ">>>",
            LineDirection::Received => "<<<",
        };
        self.transcript.push(format!("{prefix} {line}"));
        on_line(direction, line);
    }

    /// Send a command to the engine
    async fn send(
        &mut self,
        cmd: &str,
        on_line: &mut impl FnMut(LineDirection, &str),
    ) -> Result<(), EngineError> {
        debug!(cmd, "ENGINE <");
        self.record(LineDirection::Sent, cmd, on_line);
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Io(format!("Failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Io(format!("Failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    /// Read one line, bounded by the conversation deadline.
    async fn read_line(
        &mut self,
        on_line: &mut impl FnMut(LineDirection, &str),
    ) -> Result<String, EngineError> {
        let next = match self.deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, self.stdout.next_line()).await {
                    Ok(next) => next,
                    Err(_) => return Err(self.timed_out().await),
                }
            }
            None => self.stdout.next_line().await,
        };

        match next {
            Ok(Some(line)) => {
                let trimmed = line.trim().to_string();
                debug!(line = %trimmed, "ENGINE >");
                self.record(LineDirection::Received, &trimmed, on_line);
                Ok(trimmed)
            }
            Ok(None) => Err(EngineError::Protocol(
                "engine closed its output before answering".into(),
            )),
            Err(e) => Err(EngineError::Io(format!("Failed to read from engine: {e}"))),
        }
    }

    /// Kill the process and package the partial transcript.
    async fn timed_out(&mut self) -> EngineError {
        let after = self
            .started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        if let Err(e) = self.process.kill().await {
            warn!(error = %e, "Failed to kill timed-out engine");
        }
        EngineError::Timeout {
            after,
            partial: self.transcript.clone(),
        }
    }

    /// Wait for a specific response line
    async fn wait_for(
        &mut self,
        expected: &str,
        on_line: &mut impl FnMut(LineDirection, &str),
    ) -> Result<(), EngineError> {
        loop {
            if self.read_line(on_line).await? == expected {
                return Ok(());
            }
        }
    }

    /// Run the command script for one position and read until `bestmove`.
    ///
    /// All waits share one deadline `timeout` from now. On expiry the engine
    /// is killed and the partial transcript comes back in the error.
    pub async fn converse(
        &mut self,
        script: &CommandScript,
        timeout: Duration,
        mut on_line: impl FnMut(LineDirection, &str),
    ) -> Result<Conversation, EngineError> {
        let now = Instant::now();
        self.started = Some(now);
        self.deadline = Some(now.checked_add(timeout).unwrap_or(now + LONGEST_CONVERSATION));
        let on_line = &mut on_line;

        self.send(CMD_UCI, on_line).await?;
        self.wait_for(UCI_OK, on_line).await?;

        for option in script.setoption_commands() {
            self.send(&option, on_line).await?;
        }
        self.send(CMD_NEW_GAME, on_line).await?;
        self.send(CMD_IS_READY, on_line).await?;
        self.wait_for(READY_OK, on_line).await?;

        self.send(&script.position_command(), on_line).await?;
        self.send(&script.limit.go_command(), on_line).await?;

        let mut info: Option<SearchInfo> = None;
        loop {
            let line = self.read_line(on_line).await?;

            if let Some(parsed) = parse_info(&line) {
                match info.as_mut() {
                    Some(existing) => existing.merge(parsed),
                    None => info = Some(parsed),
                }
            } else if line.starts_with("bestmove") {
                let best_move = parse_bestmove(&line).ok_or_else(|| {
                    EngineError::Protocol(format!("bestmove line without a move: {line:?}"))
                })?;
                return Ok(Conversation { best_move, info });
            }
        }
    }

    /// Send `quit` and wait for the process to exit, killing it after `grace`.
    ///
    /// Returns the full transcript of the session.
    pub async fn shutdown(
        mut self,
        grace: Duration,
        mut on_line: impl FnMut(LineDirection, &str),
    ) -> Vec<String> {
        if self.has_exited() {
            return self.take_transcript();
        }
        let _ = self.send(CMD_QUIT, &mut on_line).await;

        match tokio::time::timeout(grace, self.process.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Engine exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed waiting for engine exit"),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Engine ignored quit, killing");
                if let Err(e) = self.process.kill().await {
                    warn!(error = %e, "Failed to kill engine");
                }
            }
        }
        self.take_transcript()
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_missing_engine_is_spawn_error() {
        let err = EngineSession::start(Path::new("/definitely/not/an/engine")).err();
        assert!(matches!(err, Some(EngineError::Spawn(_))));
    }

    #[test]
    fn test_resolve_program_bare_name() {
        let (program, dir) = resolve_program(Path::new("no-such-engine-on-disk"));
        assert_eq!(program, PathBuf::from("no-such-engine-on-disk"));
        assert!(dir.is_none());
    }
}
