// src/step/state.rs

//! Pure lifecycle state machine for a single build step invocation.
//!
//! ```text
//! Idle -> Validating -> Launching -> Streaming -> Completed
//!            \             \            \
//!             `-------------`------------`--> Failed(kind)
//! ```
//!
//! `Completed` and `Failed` are terminal.

use std::fmt;

use crate::errors::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Idle,
    Validating,
    Launching,
    /// Process finished; output is being written to the build log.
    Streaming,
    Completed,
    Failed(FailureKind),
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: StepState,
    pub to: StepState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal build step transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepState::Completed | StepState::Failed(_))
    }

    pub fn can_transition_to(self, next: StepState) -> bool {
        use StepState::*;
        match (self, next) {
            (Idle, Validating)
            | (Validating, Launching)
            | (Launching, Streaming)
            | (Streaming, Completed) => true,
            (Validating | Launching | Streaming, Failed(_)) => true,
            _ => false,
        }
    }

    /// Move to `next`, or report why that is not allowed.
    pub fn transition(&mut self, next: StepState) -> Result<(), IllegalTransition> {
        if !self.can_transition_to(next) {
            return Err(IllegalTransition { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }
}

impl Default for StepState {
    fn default() -> Self {
        StepState::Idle
    }
}
