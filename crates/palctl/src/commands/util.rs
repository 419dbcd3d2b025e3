//! Shared helpers for command handlers.

use std::io::IsTerminal;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the action is refused rather than
/// silently approved.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Rejoin trailing words into one command line.
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}

/// Split `KEY=VALUE`. The value may be empty or contain further `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(CliError::Validation {
            field: "assignment".into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

/// Error for a worker reply that does not match the submitted command.
pub fn unexpected_result(command: &str) -> CliError {
    CliError::Internal(format!("unexpected result for '{command}'"))
}
