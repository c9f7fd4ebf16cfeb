//! Sign-in state machine using rust-fsm.
//!
//! The machine tracks the transient states of a sign-in or sign-out in
//! flight; the durable facts (credential, identifiers) live in the session
//! store. A signed-in session can re-enter validation through
//! `Reauthenticating` when the server signals that credentials went stale.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    SignedOut    │ (initial)
//! └────────┬────────┘
//!          │ LogInAttempt
//!          ▼
//! ┌─────────────────┐  ValidationFailed
//! │   Validating    │ ─────────────────► SignedOut
//! └────────┬────────┘
//!          │ ValidationSucceeded
//!          ▼
//! ┌─────────────────┐  RefreshNeeded   ┌──────────────────┐
//! │    SignedIn     │ ───────────────► │ Reauthenticating │
//! └────────┬────────┘                  └────────┬─────────┘
//!          │ LogOutRequested                    │ LogInAttempt / ValidationFailed
//!          │        ◄───────────────────────────┤ LogOutRequested
//!          ▼                                    ▼
//! ┌─────────────────┐  LogOutComplete    Validating / SignedOut
//! │   SigningOut    │ ─────────────────► SignedOut
//! └─────────────────┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub sign_in_machine(SignedOut)

    SignedOut => {
        LogInAttempt => Validating
    },
    Validating => {
        ValidationSucceeded => SignedIn,
        ValidationFailed => SignedOut
    },
    SignedIn => {
        RefreshNeeded => Reauthenticating,
        LogOutRequested => SigningOut
    },
    Reauthenticating => {
        LogInAttempt => Validating,
        ValidationFailed => SignedOut,
        LogOutRequested => SigningOut
    },
    SigningOut => {
        LogOutComplete => SignedOut
    }
}

// Re-export the generated types with clearer names
pub use sign_in_machine::Input as SignInMachineInput;
pub use sign_in_machine::State as SignInMachineState;
pub use sign_in_machine::StateMachine as SignInMachine;

/// Public session state for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No validated credential.
    SignedOut,
    /// Credentials are being validated against the server.
    Validating,
    /// Signed in with a validated credential.
    SignedIn,
    /// Server flagged the credential as stale; awaiting re-validation.
    Reauthenticating,
    /// Sign-out (and DRM deactivation, if any) in progress.
    SigningOut,
}

impl SessionState {
    /// Returns true if a validated credential is active.
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn | SessionState::Reauthenticating)
    }

    /// Returns true if the state is an in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Validating | SessionState::Reauthenticating | SessionState::SigningOut
        )
    }
}

impl From<&SignInMachineState> for SessionState {
    fn from(state: &SignInMachineState) -> Self {
        match state {
            SignInMachineState::SignedOut => SessionState::SignedOut,
            SignInMachineState::Validating => SessionState::Validating,
            SignInMachineState::SignedIn => SessionState::SignedIn,
            SignInMachineState::Reauthenticating => SessionState::Reauthenticating,
            SignInMachineState::SigningOut => SessionState::SigningOut,
        }
    }
}

/// Payload for session state change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChangedPayload {
    /// Current session state.
    pub state: SessionState,
    /// Library this session belongs to.
    pub library: String,
    /// Server-confirmed patron identifier, if signed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_identifier: Option<String>,
}
