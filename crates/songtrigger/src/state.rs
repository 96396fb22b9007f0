//! The four-state lifecycle of the trigger.

use crate::error::TriggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Generating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Trigger,
    Succeeded,
    Failed,
}

impl UiState {
    /// Apply `event`, or refuse it.
    ///
    /// `Trigger` is accepted from every state but `Generating`, which is how
    /// a second activation during an in-flight request gets rejected.
    pub fn transition(self, event: UiEvent) -> Result<UiState, TriggerError> {
        match (self, event) {
            (UiState::Idle | UiState::Ready | UiState::Failed, UiEvent::Trigger) => {
                Ok(UiState::Generating)
            }
            (UiState::Generating, UiEvent::Succeeded) => Ok(UiState::Ready),
            (UiState::Generating, UiEvent::Failed) => Ok(UiState::Failed),
            (state, event) => Err(TriggerError::InvalidTransition { state, event }),
        }
    }

    pub fn is_busy(self) -> bool {
        self == UiState::Generating
    }
}
