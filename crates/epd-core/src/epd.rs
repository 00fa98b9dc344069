//! EPD suite parsing with a small regex-based parser.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::{LineParseError, SuiteError};

/// Label used when a line carries no `id "..."` tag.
pub const UNKNOWN_ID: &str = "Unknown";

/// Half-move and full-move counters appended to the 4-field EPD descriptor.
const DEFAULT_COUNTERS: [&str; 2] = ["0", "1"];

/// One tactics position. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub id: String,
    /// Full 6-field FEN
    pub fen: String,
    /// Accepted moves in whatever notation the suite uses (never empty)
    pub best_moves: Vec<String>,
}

impl Position {
    pub fn expected(&self) -> String {
        self.best_moves.join(", ")
    }
}

/// A parsed position together with its 1-based line in the suite file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteEntry {
    pub line: usize,
    pub position: Position,
}

/// Which lines of a suite to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteFilter {
    /// Every position, optionally capped at the first `limit`
    All { limit: Option<usize> },
    /// Only positions on these 1-based line numbers
    Lines(BTreeSet<usize>),
}

impl Default for SuiteFilter {
    fn default() -> Self {
        SuiteFilter::All { limit: None }
    }
}

static BM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s;])bm\s+([^;]+)").unwrap());

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[\s;])id\s+"([^"]+)""#).unwrap());

/// Split off the first four whitespace-separated fields, returning them and
/// the remaining operation section.
fn split_descriptor(line: &str) -> (Vec<&str>, &str) {
    let mut rest = line.trim_start();
    let mut fields = Vec::with_capacity(4);
    while fields.len() < 4 && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (fields, rest)
}

/// Parse a single EPD line into a Position.
pub fn parse_line(line: &str) -> Result<Position, LineParseError> {
    let (fields, operations) = split_descriptor(line);
    if fields.len() < 4 {
        return Err(LineParseError::TooFewFields {
            found: fields.len(),
        });
    }

    let fen = fields
        .iter()
        .chain(DEFAULT_COUNTERS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let best_moves: Vec<String> = BM_RE
        .captures(operations)
        .map(|cap| {
            cap[1]
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if best_moves.is_empty() {
        return Err(LineParseError::MissingBestMove);
    }

    let id = ID_RE
        .captures(operations)
        .map(|cap| cap[1].to_string())
        .unwrap_or_else(|| UNKNOWN_ID.to_string());

    Ok(Position {
        id,
        fen,
        best_moves,
    })
}

fn is_data_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Parse suite text, keeping the originating line of every position.
///
/// Malformed lines are skipped with a warning. The output depends only on
/// `text` and `filter`, so repeated calls give identical sequences.
pub fn parse_suite(text: &str, filter: &SuiteFilter) -> Vec<SuiteEntry> {
    let mut entries = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        if !is_data_line(line) {
            continue;
        }

        match filter {
            SuiteFilter::All { limit: Some(limit) } if entries.len() >= *limit => break,
            SuiteFilter::Lines(lines) if !lines.contains(&line_num) => continue,
            _ => {}
        }

        match parse_line(line) {
            Ok(position) => entries.push(SuiteEntry {
                line: line_num,
                position,
            }),
            Err(e) => warn!(line = line_num, error = %e, "Skipping unparsable suite line"),
        }
    }

    entries
}

/// Find the line a position came from by re-scanning the suite text.
///
/// Matches on id (unless it is the "Unknown" placeholder) or on FEN; the
/// first matching line wins.
pub fn locate_line(text: &str, target: &Position) -> Option<usize> {
    let match_id = target.id != UNKNOWN_ID;
    text.lines()
        .enumerate()
        .filter(|(_, line)| is_data_line(line))
        .find_map(|(idx, line)| {
            let pos = parse_line(line).ok()?;
            let same = (match_id && pos.id == target.id) || pos.fen == target.fen;
            same.then_some(idx + 1)
        })
}

/// Count the positions a full load would return.
pub fn count_positions(text: &str) -> usize {
    text.lines()
        .filter(|line| is_data_line(line))
        .filter(|line| parse_line(line).is_ok())
        .count()
}

/// A suite file held in memory.
#[derive(Debug, Clone)]
pub struct Suite {
    path: PathBuf,
    text: String,
}

impl Suite {
    /// Read a suite from disk. A missing file is fatal for the run.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SuiteError::from_io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn entries(&self, filter: &SuiteFilter) -> Vec<SuiteEntry> {
        parse_suite(&self.text, filter)
    }

    pub fn positions(&self, filter: &SuiteFilter) -> Vec<Position> {
        self.entries(filter)
            .into_iter()
            .map(|entry| entry.position)
            .collect()
    }

    /// Number of loadable positions.
    pub fn len(&self) -> usize {
        count_positions(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn locate_line(&self, position: &Position) -> Option<usize> {
        locate_line(&self.text, position)
    }
}
