//! Multi-step authentication flow: login, signup and password reset.
//!
//! - [`state`] - the step state machine
//! - [`forms`] - form values and client-side validation
//! - [`AuthFlowController`] - drives the flow against an [`AuthApi`] and
//!   installs the session on login
//!
//! [`AuthApi`]: crate::api::AuthApi

mod controller;
pub mod forms;
pub mod state;

pub use controller::{
    AuthFlowController, AuthForms, Navigation, Notice, SubmitOutcome, SubmitTicket,
};
pub use forms::{Field, FieldErrors};
pub use state::{AuthStep, FlowEvent, ResetCompletion, ResetStep};

use thiserror::Error;

use crate::api::ApiError;
use crate::error::CONNECTION_PROBLEM;

/// Why a submission did not advance the flow.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Client-side validation failed; nothing was sent.
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    /// The backend answered `status: false`.
    #[error("{message}")]
    Functional { message: String },

    /// No usable answer from the backend.
    #[error("Transport failure: {0}")]
    Transport(#[source] ApiError),

    /// This step already has a submission outstanding.
    #[error("A submission for this step is already in progress")]
    InFlight,

    /// The modal is closed.
    #[error("The authentication dialog is not open")]
    NotOpen,

    /// The submission does not belong to the current step.
    #[error("Cannot submit {expected} while on {actual}")]
    WrongStep { expected: AuthStep, actual: AuthStep },

    /// The completion belongs to a submission that no longer applies.
    #[error("Stale submission discarded")]
    Stale,
}

impl SubmitError {
    /// Text safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::Functional { message } => message.clone(),
            Self::Transport(_) => CONNECTION_PROBLEM.to_string(),
            Self::InFlight => "Please wait for the current request to finish.".to_string(),
            Self::NotOpen | Self::WrongStep { .. } | Self::Stale => "Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_hides_details() {
        let err = SubmitError::Transport(ApiError::Status {
            status: 500,
            body: "stack trace".to_string(),
        });
        assert_eq!(err.user_message(), CONNECTION_PROBLEM);
        assert!(err.to_string().contains("stack trace"));
    }

    #[test]
    fn test_wrong_step_display() {
        let err = SubmitError::WrongStep {
            expected: AuthStep::Signup,
            actual: AuthStep::Login,
        };
        assert_eq!(err.to_string(), "Cannot submit signup while on login");
    }
}
