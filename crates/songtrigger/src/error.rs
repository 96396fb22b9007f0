use std::fmt;
use thiserror::Error;

use crate::state::{UiEvent, UiState};

/// The text shown to the user for every failed generation.
pub const FAILURE_MESSAGE: &str = "Error generating song.";

/// What went wrong while fetching a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The request never produced a response (connect, DNS, reset).
    Transport,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// Headers arrived but the body could not be read in full.
    Body,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport failure"),
            Self::Status(code) => write!(f, "server returned status {}", code),
            Self::Body => write!(f, "failed to read response body"),
        }
    }
}

/// A failed generation, carried intact even though the user only ever sees
/// [`FAILURE_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    /// Diagnostic detail. For `Status` this is the server's response body,
    /// whose shape is not part of the contract.
    pub message: Option<String>,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.kind, message),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for GenerationError {}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: Option<String>) -> Self {
        Self { kind, message }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Transport, Some(message.into()))
    }

    pub fn status(code: u16, message: Option<String>) -> Self {
        Self::new(GenerationErrorKind::Status(code), message)
    }

    pub fn body(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Body, Some(message.into()))
    }

    /// What the user sees, whatever the kind.
    pub fn user_message(&self) -> &'static str {
        FAILURE_MESSAGE
    }
}

/// Misuse of the trigger state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("cannot apply {event:?} while {state:?}")]
    InvalidTransition { state: UiState, event: UiEvent },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        let err = GenerationError::status(500, Some("corpus missing".into()));
        assert_eq!(err.to_string(), "server returned status 500: corpus missing");

        let err = GenerationError::new(GenerationErrorKind::Body, None);
        assert_eq!(err.to_string(), "failed to read response body");
    }

    #[test]
    fn every_kind_collapses_to_one_user_message() {
        for err in [
            GenerationError::transport("connection refused"),
            GenerationError::status(404, None),
            GenerationError::body("eof"),
        ] {
            assert_eq!(err.user_message(), "Error generating song.");
        }
    }
}
