//! Interactive retesting of failed positions.

pub mod controller;
pub mod machine;
pub mod shell;

pub use controller::{BatchTally, RetestController, SingleRetest};
pub use machine::{MenuCommand, RetestState};
pub use shell::RetestShell;
