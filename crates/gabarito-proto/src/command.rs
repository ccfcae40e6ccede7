//! Operator console grammar.
//!
//! The console is a newline-delimited text channel and is the only command
//! surface of the kiosk. The grammar is closed:
//!
//! | Line                               | Command                  |
//! |------------------------------------|--------------------------|
//! | `modo cadastro`                    | [`Command::EnterRegistration`] |
//! | `modo producao` / `modo operacao`  | [`Command::EnterOperation`]    |
//! | `apagar <n>` (1-based)             | [`Command::Delete`]            |
//! | `limpar`                           | [`Command::Wipe`]              |
//! | `fim`                              | [`Command::Finish`]            |
//! | anything else                      | [`Command::Text`]              |
//!
//! Keywords are matched case-insensitively after trimming; runs of inner
//! whitespace are collapsed. Free text keeps its original case, since it
//! carries piece names.

use crate::error::CommandError;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch to Registration mode.
    EnterRegistration,
    /// Switch to Operation mode.
    EnterOperation,
    /// Delete the template at a 1-based index.
    Delete {
        /// Index as typed by the operator (1-based, never zero).
        index: usize,
    },
    /// Remove every template.
    Wipe,
    /// End the piece-input loop of a registration.
    Finish,
    /// Free text (piece names, or an unrecognized command).
    Text(String),
}

impl Command {
    /// Parse one console line.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidIndex` for `apagar` with a missing,
    /// non-numeric or zero index.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

        match normalized.as_str() {
            "modo cadastro" => return Ok(Self::EnterRegistration),
            "modo producao" | "modo operacao" => return Ok(Self::EnterOperation),
            "limpar" => return Ok(Self::Wipe),
            "fim" => return Ok(Self::Finish),
            _ => {},
        }

        if let Some(argument) = normalized.strip_prefix("apagar") {
            if argument.is_empty() || argument.starts_with(' ') {
                return parse_index(argument.trim()).map(|index| Self::Delete { index });
            }
        }

        Ok(Self::Text(trimmed.to_owned()))
    }

    /// True for the commands that change mode.
    pub fn is_mode_switch(&self) -> bool {
        matches!(self, Self::EnterRegistration | Self::EnterOperation)
    }
}

fn parse_index(argument: &str) -> Result<usize, CommandError> {
    match argument.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(CommandError::InvalidIndex { argument: argument.to_owned() }),
    }
}
