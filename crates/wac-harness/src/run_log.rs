//! Human-readable run transcript, one file per run or retest action.

use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use crate::error::HarnessError;

/// Timestamp used in artifact file names.
pub fn file_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Make a label safe to embed in a file name.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Line-buffered log file. Writes are streamed as they happen; a failed
/// write is reported once through tracing and otherwise ignored.
pub struct RunLog {
    path: PathBuf,
    out: LineWriter<File>,
    write_failed: bool,
}

impl RunLog {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            out: LineWriter::new(file),
            write_failed: false,
        })
    }

    /// Create `<dir>/<prefix>_<timestamp>.txt`.
    pub fn create_in(dir: &Path, prefix: &str) -> Result<Self, HarnessError> {
        std::fs::create_dir_all(dir)?;
        Self::create(dir.join(format!("{prefix}_{}.txt", file_timestamp())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        if let Err(e) = writeln!(self.out, "{}", text.as_ref()) {
            if !self.write_failed {
                warn!(path = %self.path.display(), error = %e, "Failed to write run log");
                self.write_failed = true;
            }
        }
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    pub fn rule(&mut self) {
        self.line("=".repeat(60));
    }

    /// Header common to every log: title, timestamp and free-form details.
    pub fn header(&mut self, title: &str, details: &[String]) {
        self.line(title);
        self.line(format!("Timestamp: {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
        for detail in details {
            self.line(detail);
        }
        self.blank();
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}
