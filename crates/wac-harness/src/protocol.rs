//! UCI command building and output-line parsing.
//!
//! Pure helpers shared by the engine session and the controllers. Nothing
//! here knows about processes.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

/// Longest per-position search time accepted from the user (one day).
pub const MAX_SEARCH_SECS: u64 = 86_400;

/// How long the engine may search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    /// Fixed depth in plies
    Depth(u32),
    /// Fixed thinking time
    MoveTime(Duration),
}

impl SearchLimit {
    pub fn from_secs(secs: u64) -> Self {
        SearchLimit::MoveTime(Duration::from_secs(secs))
    }

    pub fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(depth) => format!("go depth {depth}"),
            SearchLimit::MoveTime(time) => format!("go movetime {}", time.as_millis()),
        }
    }

    /// Wall-clock deadline for a whole conversation under this limit.
    pub fn deadline(&self, grace: Duration, depth_timeout: Duration) -> Duration {
        match self {
            SearchLimit::Depth(_) => depth_timeout,
            SearchLimit::MoveTime(time) => time.saturating_add(grace),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SearchLimit::Depth(depth) => format!("depth {depth}"),
            SearchLimit::MoveTime(time) => format!("{} seconds", time.as_secs_f64()),
        }
    }
}

/// The fixed command sequence sent for one position.
#[derive(Debug, Clone)]
pub struct CommandScript {
    /// `setoption` pairs sent after the handshake
    pub options: Vec<(String, String)>,
    pub fen: String,
    pub limit: SearchLimit,
}

impl CommandScript {
    pub fn new(fen: impl Into<String>, limit: SearchLimit) -> Self {
        Self {
            options: Vec::new(),
            fen: fen.into(),
            limit,
        }
    }

    pub fn with_options(mut self, options: Vec<(String, String)>) -> Self {
        self.options = options;
        self
    }

    pub fn setoption_commands(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|(name, value)| format!("setoption name {name} value {value}"))
            .collect()
    }

    pub fn position_command(&self) -> String {
        format!("position fen {}", self.fen)
    }
}

pub const CMD_UCI: &str = "uci";
pub const CMD_NEW_GAME: &str = "ucinewgame";
pub const CMD_IS_READY: &str = "isready";
pub const CMD_QUIT: &str = "quit";
pub const UCI_OK: &str = "uciok";
pub const READY_OK: &str = "readyok";

/// Engine score from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "cp {cp}"),
            Score::Mate(n) => write!(f, "mate {n}"),
        }
    }
}

/// Fields picked out of an `info` line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time_ms: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

impl SearchInfo {
    /// Fold a newer info line into this one, keeping fields it does not carry.
    pub fn merge(&mut self, newer: SearchInfo) {
        self.depth = newer.depth.or(self.depth);
        self.seldepth = newer.seldepth.or(self.seldepth);
        self.nodes = newer.nodes.or(self.nodes);
        self.nps = newer.nps.or(self.nps);
        self.time_ms = newer.time_ms.or(self.time_ms);
        self.score = newer.score.or(self.score);
        if !newer.pv.is_empty() {
            self.pv = newer.pv;
        }
    }
}

/// Parsed `bestmove` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMove {
    pub mv: String,
    pub ponder: Option<String>,
}

fn parse_value<T: std::str::FromStr>(line: &str, key: &str, token: Option<&&str>) -> Option<T> {
    let raw = token?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(line, key, value = *raw, "Ignoring malformed info value");
            None
        }
    }
}

/// Parse an `info` line. Returns `None` for anything that is not an info
/// line; malformed values inside one are dropped, not fatal.
pub fn parse_info(line: &str) -> Option<SearchInfo> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") {
        return None;
    }

    let mut info = SearchInfo::default();
    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                info.depth = parse_value(line, "depth", parts.get(i + 1));
                i += 2;
            }
            "seldepth" => {
                info.seldepth = parse_value(line, "seldepth", parts.get(i + 1));
                i += 2;
            }
            "nodes" => {
                info.nodes = parse_value(line, "nodes", parts.get(i + 1));
                i += 2;
            }
            "nps" => {
                info.nps = parse_value(line, "nps", parts.get(i + 1));
                i += 2;
            }
            "time" => {
                info.time_ms = parse_value(line, "time", parts.get(i + 1));
                i += 2;
            }
            "score" => {
                info.score = match parts.get(i + 1) {
                    Some(&"cp") => parse_value(line, "cp", parts.get(i + 2)).map(Score::Centipawns),
                    Some(&"mate") => parse_value(line, "mate", parts.get(i + 2)).map(Score::Mate),
                    _ => None,
                };
                i += 3;
            }
            "pv" => {
                // PV runs to the end of the line
                info.pv = parts[i + 1..].iter().map(|m| m.to_string()).collect();
                break;
            }
            "string" => break,
            _ => i += 1,
        }
    }

    Some(info)
}

/// Parse a `bestmove <move> [ponder <move>]` line.
pub fn parse_bestmove(line: &str) -> Option<BestMove> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"bestmove") {
        return None;
    }
    let mv = parts.get(1)?.to_string();
    let ponder = match parts.get(2) {
        Some(&"ponder") => parts.get(3).map(|m| m.to_string()),
        _ => None,
    };
    Some(BestMove { mv, ponder })
}
