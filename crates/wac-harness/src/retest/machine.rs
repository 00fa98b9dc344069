//! Retest menu state machine and input parsing. No I/O.

use thiserror::Error;

use crate::protocol::MAX_SEARCH_SECS;

/// Default search time for retesting one position.
pub const DEFAULT_SINGLE_SECS: u64 = 10;
/// Default search time per position for a batch retest.
pub const DEFAULT_BATCH_SECS: u64 = 15;

/// A menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Retest one failed position (0-based slot in the failed list)
    Select(usize),
    All,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MenuInputError {
    #[error("Invalid position number. Please enter 1-{max}")]
    OutOfRange { max: usize },

    #[error("Invalid input. Please enter a number, 'all', or 'quit'")]
    Unrecognized,
}

/// Translate free text into a menu command. `failed_count` bounds the
/// 1-based position numbers.
pub fn parse_menu_choice(input: &str, failed_count: usize) -> Result<MenuCommand, MenuInputError> {
    let choice = input.trim().to_lowercase();
    match choice.as_str() {
        "quit" | "q" | "exit" => Ok(MenuCommand::Quit),
        "all" => Ok(MenuCommand::All),
        "help" | "h" => Ok(MenuCommand::Help),
        other => {
            let number: usize = other.parse().map_err(|_| MenuInputError::Unrecognized)?;
            if (1..=failed_count).contains(&number) {
                Ok(MenuCommand::Select(number - 1))
            } else {
                Err(MenuInputError::OutOfRange { max: failed_count })
            }
        }
    }
}

/// Where the retest loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetestState {
    MenuDisplay,
    SingleSelect { slot: usize },
    BatchAll,
    Help,
    Quit,
}

impl RetestState {
    /// Apply a menu command. Commands only act from the menu; `Quit` ends
    /// the loop from anywhere.
    pub fn next(self, command: MenuCommand) -> RetestState {
        match (self, command) {
            (_, MenuCommand::Quit) => RetestState::Quit,
            (RetestState::Quit, _) => RetestState::Quit,
            (RetestState::MenuDisplay, MenuCommand::Select(slot)) => {
                RetestState::SingleSelect { slot }
            }
            (RetestState::MenuDisplay, MenuCommand::All) => RetestState::BatchAll,
            (RetestState::MenuDisplay, MenuCommand::Help) => RetestState::Help,
            (state, _) => state,
        }
    }

    /// The state after the current action has finished.
    pub fn settle(self) -> RetestState {
        match self {
            RetestState::Quit => RetestState::Quit,
            _ => RetestState::MenuDisplay,
        }
    }

    pub fn is_done(self) -> bool {
        self == RetestState::Quit
    }
}

/// Answer to a search-time prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetChoice {
    Seconds(u64),
    Back,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetError {
    #[error("Please enter a positive number")]
    NotPositive,

    #[error("Please enter a valid number")]
    NotANumber,

    #[error("Please enter at most {max} seconds")]
    TooLarge { max: u64 },
}

/// Parse a search-time answer. Empty input takes `default`; `back` is only
/// accepted when `allow_back` is set.
pub fn parse_budget(
    input: &str,
    default: u64,
    allow_back: bool,
) -> Result<BudgetChoice, BudgetError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(BudgetChoice::Seconds(default));
    }
    if allow_back && matches!(input.to_lowercase().as_str(), "back" | "b") {
        return Ok(BudgetChoice::Back);
    }
    let too_large = BudgetError::TooLarge {
        max: MAX_SEARCH_SECS,
    };
    match input.parse::<i64>() {
        Ok(secs) if secs <= 0 => Err(BudgetError::NotPositive),
        Ok(secs) if secs as u64 > MAX_SEARCH_SECS => Err(too_large),
        Ok(secs) => Ok(BudgetChoice::Seconds(secs as u64)),
        Err(_) if input.bytes().all(|b| b.is_ascii_digit()) => Err(too_large),
        Err(_) => Err(BudgetError::NotANumber),
    }
}

/// `y`/`yes`, case-insensitive.
pub fn parse_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
