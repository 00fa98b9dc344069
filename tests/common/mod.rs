#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use wac_harness::HarnessConfig;

/// Two-position suite: T1 is a rook capture written in SAN, T2 a promotion.
pub const TACTICS_SUITE: &str = "\
# stub suite
r3k2r/8/8/8/8/1R6/1p6/4K3 w - - bm Rxb2; id \"T1\";
8/4P3/8/8/8/8/k7/4K3 w - - bm e8=Q; id \"T2\";
";

/// Engine that answers `b3b2` for the T1 position and `e7e8q` otherwise.
pub const ANSWERING_ENGINE: &str = r#"#!/bin/sh
move=e7e8q
while read -r line; do
  case "$line" in
    uci) echo "id name Stub"; echo "uciok" ;;
    isready) echo "readyok" ;;
    position*r3k2r*) move=b3b2 ;;
    position*) move=e7e8q ;;
    go*) echo "info depth 4 score cp 250 nodes 1200 pv $move"; echo "bestmove $move" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Engine that handshakes and then never produces `bestmove`.
pub const SILENT_ENGINE: &str = r#"#!/bin/sh
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1" ;;
  esac
done
"#;

/// Engine that searches normally but ignores `quit` and SIGTERM.
pub const STUBBORN_ENGINE: &str = r#"#!/bin/sh
trap '' TERM
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "bestmove e2e4" ;;
  esac
done
"#;

/// Engine that never acknowledges `uci` but would answer `go`.
pub const NO_HANDSHAKE_ENGINE: &str = r#"#!/bin/sh
while read -r line; do
  case "$line" in
    isready) echo "readyok" ;;
    go*) echo "bestmove e2e4" ;;
  esac
done
"#;

/// Generate a unique suffix based on the current timestamp.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wac-it-{tag}-{}", unique_suffix()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_suite(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("suite.epd");
    std::fs::write(&path, text).unwrap();
    path
}

/// Write an executable shell script acting as a UCI engine.
#[cfg(unix)]
pub fn write_stub_engine(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("stub-engine.sh");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Config pointing at `engine` with short timeouts.
pub fn config_for(engine: &Path, dir: &Path) -> HarnessConfig {
    HarnessConfig {
        engine_path: engine.to_path_buf(),
        suite_path: dir.join("suite.epd"),
        output_dir: dir.to_path_buf(),
        timeout_grace: Duration::from_secs(1),
        depth_timeout: Duration::from_secs(2),
        shutdown_grace: Duration::from_millis(500),
        ..HarnessConfig::default()
    }
}
