//! EPD tactics-suite parsing and move matching.
//!
//! Everything here is pure: no engine processes, no async.

pub mod epd;
pub mod error;
pub mod failed_index;
pub mod matcher;

pub use epd::{Position, Suite, SuiteEntry, SuiteFilter};
pub use error::{LineParseError, SuiteError};
pub use matcher::{moves_match, normalize_move, MatchPolicy};
