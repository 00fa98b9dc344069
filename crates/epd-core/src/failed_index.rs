//! Failed-position index files.
//!
//! One suite line number per line, preceded by `#` comment lines that say
//! how to resume. Anything that is not a bare number is ignored on read.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::SuiteError;

/// Render the file contents for the given suite line numbers.
pub fn render(line_numbers: &[usize], file_name: &str) -> String {
    let mut out = String::new();
    out.push_str("# Failed WAC position line numbers\n");
    let _ = writeln!(out, "# Use: wac-harness --failed-file {file_name}");
    out.push_str("# to retest only these positions\n\n");
    for line in line_numbers {
        let _ = writeln!(out, "{line}");
    }
    out
}

/// Parse line numbers out of a failed-index file's text.
pub fn parse(text: &str) -> BTreeSet<usize> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|line| line.parse().ok())
        .collect()
}

/// Write a failed-index file.
pub fn write(path: &Path, line_numbers: &[usize]) -> Result<(), SuiteError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::fs::write(path, render(line_numbers, &file_name)).map_err(|e| SuiteError::from_io(path, e))
}

/// Read a failed-index file. A missing file is reported as `NotFound`.
pub fn read(path: &Path) -> Result<BTreeSet<usize>, SuiteError> {
    let text = std::fs::read_to_string(path).map_err(|e| SuiteError::from_io(path, e))?;
    Ok(parse(&text))
}
