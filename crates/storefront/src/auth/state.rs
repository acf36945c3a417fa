//! Step state machine of the authentication modal.
//!
//! The reset sub-flow carries its own step, so "step 3 while on Login"
//! cannot be expressed. Every move goes through [`transition`].

use std::fmt;
use std::str::FromStr;

/// Step within the forgot-password flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetStep {
    /// 1: enter the account email.
    RequestCode,
    /// 2: enter the emailed code.
    VerifyCode,
    /// 3: choose a new password.
    SetNewPassword,
    /// 4: confirmation screen.
    Done,
}

impl ResetStep {
    /// 1-based position in the flow.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::RequestCode => 1,
            Self::VerifyCode => 2,
            Self::SetNewPassword => 3,
            Self::Done => 4,
        }
    }
}

/// Screen currently shown by the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthStep {
    #[default]
    Login,
    Signup,
    ForgotPassword(ResetStep),
}

impl AuthStep {
    /// The first step of the reset flow.
    pub const FORGOT_PASSWORD: Self = Self::ForgotPassword(ResetStep::RequestCode);

    /// The reset sub-step, if in the reset flow.
    #[must_use]
    pub const fn reset_step(self) -> Option<ResetStep> {
        match self {
            Self::ForgotPassword(step) => Some(step),
            _ => None,
        }
    }
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("login"),
            Self::Signup => f.write_str("signup"),
            Self::ForgotPassword(step) => write!(f, "forgot-password/{}", step.number()),
        }
    }
}

/// Where a successful password reset lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetCompletion {
    /// Back to Login with a success notice.
    #[default]
    ReturnToLogin,
    /// To the Done screen; [`FlowEvent::ContinueToLogin`] leaves it.
    ShowDone,
}

impl FromStr for ResetCompletion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "login" => Ok(Self::ReturnToLogin),
            "done" => Ok(Self::ShowDone),
            other => Err(format!("expected 'login' or 'done', got '{other}'")),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    SwitchToSignup,
    SwitchToLogin,
    ForgotPassword,
    Back,
    /// Step 1 succeeded.
    CodeRequested,
    /// Step 2 succeeded.
    CodeVerified,
    /// Step 3 succeeded.
    PasswordReset(ResetCompletion),
    /// Leave the Done screen.
    ContinueToLogin,
    /// Modal opened or closed.
    Reset,
}

/// Apply `event` to `step`.
///
/// Returns `None` when the event has no meaning in `step`; callers keep the
/// current step in that case.
#[must_use]
pub const fn transition(step: AuthStep, event: FlowEvent) -> Option<AuthStep> {
    use AuthStep::{ForgotPassword, Login, Signup};
    use ResetStep::{Done, RequestCode, SetNewPassword, VerifyCode};

    let next = match (step, event) {
        (_, FlowEvent::Reset) => Login,

        (Login, FlowEvent::SwitchToSignup) => Signup,
        (Login, FlowEvent::ForgotPassword) => ForgotPassword(RequestCode),
        (Signup, FlowEvent::SwitchToLogin) => Login,

        (ForgotPassword(RequestCode), FlowEvent::CodeRequested) => ForgotPassword(VerifyCode),
        (ForgotPassword(RequestCode), FlowEvent::Back | FlowEvent::SwitchToLogin) => Login,

        (ForgotPassword(VerifyCode), FlowEvent::CodeVerified) => ForgotPassword(SetNewPassword),
        (ForgotPassword(VerifyCode), FlowEvent::Back) => ForgotPassword(RequestCode),

        (ForgotPassword(SetNewPassword), FlowEvent::PasswordReset(ResetCompletion::ReturnToLogin)) => {
            Login
        }
        (ForgotPassword(SetNewPassword), FlowEvent::PasswordReset(ResetCompletion::ShowDone)) => {
            ForgotPassword(Done)
        }
        (ForgotPassword(SetNewPassword), FlowEvent::Back) => ForgotPassword(VerifyCode),

        (ForgotPassword(Done), FlowEvent::ContinueToLogin) => Login,

        _ => return None,
    };
    Some(next)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL_STEPS: [AuthStep; 6] = [
        AuthStep::Login,
        AuthStep::Signup,
        AuthStep::ForgotPassword(ResetStep::RequestCode),
        AuthStep::ForgotPassword(ResetStep::VerifyCode),
        AuthStep::ForgotPassword(ResetStep::SetNewPassword),
        AuthStep::ForgotPassword(ResetStep::Done),
    ];

    #[test]
    fn test_reset_always_returns_to_login() {
        for step in ALL_STEPS {
            assert_eq!(transition(step, FlowEvent::Reset), Some(AuthStep::Login));
        }
    }

    #[test]
    fn test_happy_reset_path() {
        let mut step = AuthStep::Login;
        for event in [
            FlowEvent::ForgotPassword,
            FlowEvent::CodeRequested,
            FlowEvent::CodeVerified,
            FlowEvent::PasswordReset(ResetCompletion::ReturnToLogin),
        ] {
            step = transition(step, event).unwrap();
        }
        assert_eq!(step, AuthStep::Login);
    }

    #[test]
    fn test_done_variant() {
        let step = transition(
            AuthStep::ForgotPassword(ResetStep::SetNewPassword),
            FlowEvent::PasswordReset(ResetCompletion::ShowDone),
        )
        .unwrap();
        assert_eq!(step, AuthStep::ForgotPassword(ResetStep::Done));
        assert_eq!(
            transition(step, FlowEvent::ContinueToLogin),
            Some(AuthStep::Login)
        );
        assert_eq!(transition(step, FlowEvent::Back), None);
    }

    #[test]
    fn test_back_moves_one_step() {
        assert_eq!(
            transition(AuthStep::ForgotPassword(ResetStep::VerifyCode), FlowEvent::Back),
            Some(AuthStep::FORGOT_PASSWORD)
        );
        assert_eq!(
            transition(
                AuthStep::ForgotPassword(ResetStep::SetNewPassword),
                FlowEvent::Back
            ),
            Some(AuthStep::ForgotPassword(ResetStep::VerifyCode))
        );
        assert_eq!(
            transition(AuthStep::FORGOT_PASSWORD, FlowEvent::Back),
            Some(AuthStep::Login)
        );
    }

    #[test]
    fn test_illegal_events_are_rejected() {
        assert_eq!(transition(AuthStep::Login, FlowEvent::CodeVerified), None);
        assert_eq!(transition(AuthStep::Signup, FlowEvent::ForgotPassword), None);
        assert_eq!(transition(AuthStep::Login, FlowEvent::Back), None);
        assert_eq!(
            transition(AuthStep::FORGOT_PASSWORD, FlowEvent::CodeVerified),
            None
        );
    }

    #[test]
    fn test_reset_completion_from_str() {
        assert_eq!(
            "login".parse::<ResetCompletion>().unwrap(),
            ResetCompletion::ReturnToLogin
        );
        assert_eq!(
            " DONE ".parse::<ResetCompletion>().unwrap(),
            ResetCompletion::ShowDone
        );
        assert!("home".parse::<ResetCompletion>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AuthStep::ForgotPassword(ResetStep::SetNewPassword).to_string(),
            "forgot-password/3"
        );
    }
}
