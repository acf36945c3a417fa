//! Authentication modal controller.
//!
//! # Submission protocol
//!
//! Every step is submitted in two halves so a presentation layer can keep
//! its inputs live while the request is outstanding:
//!
//! 1. `begin_*` checks the modal is open and on the right step, validates
//!    the form and returns a [`SubmitTicket`] plus the owned request body.
//!    The step is now in flight; a second `begin_*` for it is refused.
//! 2. `complete_*` takes the ticket and the API result and applies it.
//!    Completions whose ticket no longer matches (modal closed, reopened,
//!    or the user navigated away) are discarded.
//!
//! The `submit_*` methods run both halves against the controller's API.
//!
//! Any failed submission wipes the password fields of the form it came
//! from. Email fields are kept.

use harbor_core::{Email, VerificationCode};

use crate::api::{
    ApiError, ApiResponse, AuthApi, ForgotPasswordRequest, LoginData, LoginRequest,
    ResetPasswordRequest, SignupRequest, VerifyCodeRequest,
};
use crate::error::add_breadcrumb;
use crate::session::{SessionStore, SessionUser};

use super::SubmitError;
use super::forms::{
    FieldErrors, LoginForm, RequestCodeForm, ResetPasswordForm, SignupForm, VerifyCodeForm,
};
use super::state::{AuthStep, FlowEvent, ResetCompletion, ResetStep, transition};

const LOGIN_FAILED: &str = "Login failed. Please check your email and password.";
const SIGNUP_FAILED: &str = "Sign up failed. Please try again.";
const REQUEST_CODE_FAILED: &str = "Could not send the verification code.";
const VERIFY_CODE_FAILED: &str = "The verification code is invalid or has expired.";
const RESET_PASSWORD_FAILED: &str = "Could not reset the password.";

// =============================================================================
// Outcomes
// =============================================================================

/// Where the presentation layer should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Home,
}

/// Informational message to show after a step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Signup succeeded; the account must be verified by email.
    CheckEmail,
    /// The password was changed.
    PasswordReset,
}

impl Notice {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::CheckEmail => "Account created. Please check your email to verify it.",
            Self::PasswordReset => "Your password has been reset. Please log in.",
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Session installed and modal closed.
    LoggedIn(Navigation),
    /// Account created and modal closed; not logged in.
    SignedUp,
    /// Moved on within the reset flow.
    Advanced(AuthStep),
    /// Password changed; the step the flow landed on.
    PasswordReset(AuthStep),
}

/// Proof that a submission was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTicket {
    id: u64,
    generation: u64,
    step: AuthStep,
}

impl SubmitTicket {
    /// Step the submission belongs to.
    #[must_use]
    pub const fn step(&self) -> AuthStep {
        self.step
    }
}

/// Form values for every step.
#[derive(Debug, Clone, Default)]
pub struct AuthForms {
    pub login: LoginForm,
    pub signup: SignupForm,
    pub request_code: RequestCodeForm,
    pub verify_code: VerifyCodeForm,
    pub reset_password: ResetPasswordForm,
}

// =============================================================================
// Controller
// =============================================================================

/// Owns the modal's step, form values and submission state.
pub struct AuthFlowController<A> {
    api: A,
    session: SessionStore,
    reset_completion: ResetCompletion,

    is_open: bool,
    step: AuthStep,
    forms: AuthForms,

    /// Bumped on every open and close.
    generation: u64,
    next_ticket: u64,
    in_flight: Option<SubmitTicket>,

    verification_email: Option<Email>,
    verified_code: Option<VerificationCode>,
    pending_email: Option<Email>,
    pending_code: Option<VerificationCode>,

    error: Option<String>,
    field_errors: FieldErrors,
    notice: Option<Notice>,
}

impl<A: AuthApi> AuthFlowController<A> {
    #[must_use]
    pub fn new(api: A, session: SessionStore, reset_completion: ResetCompletion) -> Self {
        Self {
            api,
            session,
            reset_completion,
            is_open: false,
            step: AuthStep::Login,
            forms: AuthForms::default(),
            generation: 0,
            next_ticket: 0,
            in_flight: None,
            verification_email: None,
            verified_code: None,
            pending_email: None,
            pending_code: None,
            error: None,
            field_errors: FieldErrors::default(),
            notice: None,
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub const fn step(&self) -> AuthStep {
        self.step
    }

    #[must_use]
    pub const fn forms(&self) -> &AuthForms {
        &self.forms
    }

    /// Form values stay editable while a submission is in flight.
    pub const fn forms_mut(&mut self) -> &mut AuthForms {
        &mut self.forms
    }

    /// Email captured at reset step 1.
    #[must_use]
    pub const fn verification_email(&self) -> Option<&Email> {
        self.verification_email.as_ref()
    }

    /// Whether a submission for the current step is outstanding.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some_and(|t| t.step == self.step)
    }

    /// Message from the last failed submission of the current step.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validation errors from the last submission of the current step.
    #[must_use]
    pub const fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    #[must_use]
    pub const fn notice(&self) -> Option<Notice> {
        self.notice
    }

    pub const fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Open the modal at Login with fresh forms.
    pub fn open(&mut self) {
        self.reset();
        self.is_open = true;
        self.notice = None;
        tracing::debug!("Auth modal opened");
    }

    /// Close the modal, discarding all flow state.
    pub fn close(&mut self) {
        self.reset();
        self.notice = None;
        tracing::debug!("Auth modal closed");
    }

    pub fn switch_to_signup(&mut self) -> bool {
        self.apply(FlowEvent::SwitchToSignup)
    }

    pub fn switch_to_login(&mut self) -> bool {
        self.apply(FlowEvent::SwitchToLogin)
    }

    pub fn forgot_password(&mut self) -> bool {
        self.apply(FlowEvent::ForgotPassword)
    }

    /// Go back one step in the reset flow.
    pub fn back(&mut self) -> bool {
        let from = self.step;
        let moved = self.apply(FlowEvent::Back);
        if moved && from == AuthStep::ForgotPassword(ResetStep::SetNewPassword) {
            self.verified_code = None;
        }
        moved
    }

    /// Leave the Done screen.
    pub fn continue_to_login(&mut self) -> bool {
        self.apply(FlowEvent::ContinueToLogin)
    }

    fn reset(&mut self) {
        self.is_open = false;
        self.generation += 1;
        self.step = AuthStep::Login;
        self.forms = AuthForms::default();
        self.in_flight = None;
        self.verification_email = None;
        self.verified_code = None;
        self.pending_email = None;
        self.pending_code = None;
        self.error = None;
        self.field_errors = FieldErrors::default();
    }

    fn apply(&mut self, event: FlowEvent) -> bool {
        if !self.is_open {
            tracing::debug!(?event, "Ignoring auth event while closed");
            return false;
        }

        let from = self.step;
        let Some(to) = transition(from, event) else {
            tracing::debug!(step = %from, ?event, "Ignoring auth event");
            return false;
        };

        self.step = to;
        self.in_flight = None;
        self.error = None;
        self.field_errors = FieldErrors::default();

        tracing::info!(from = %from, to = %to, "Auth step changed");
        let (from, to) = (from.to_string(), to.to_string());
        add_breadcrumb(
            "auth",
            "Auth step changed",
            Some(&[("from", from.as_str()), ("to", to.as_str())]),
        );
        true
    }

    // =========================================================================
    // Submission plumbing
    // =========================================================================

    fn guard(&self, expected: AuthStep) -> Result<(), SubmitError> {
        if !self.is_open {
            return Err(SubmitError::NotOpen);
        }
        if self.step != expected {
            return Err(SubmitError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        if self.in_flight.is_some_and(|t| t.step == expected) {
            return Err(SubmitError::InFlight);
        }
        Ok(())
    }

    /// Turn a validation result into a ticket, or record the errors.
    fn start<R>(&mut self, validated: Result<R, FieldErrors>) -> Result<(SubmitTicket, R), SubmitError> {
        self.error = None;
        self.field_errors = FieldErrors::default();

        match validated {
            Ok(request) => {
                self.next_ticket += 1;
                let ticket = SubmitTicket {
                    id: self.next_ticket,
                    generation: self.generation,
                    step: self.step,
                };
                self.in_flight = Some(ticket);
                tracing::debug!(step = %ticket.step, ticket = ticket.id, "Submission started");
                Ok((ticket, request))
            }
            Err(errors) => {
                tracing::debug!(step = %self.step, errors = %errors, "Validation failed");
                self.field_errors = errors.clone();
                self.clear_passwords(self.step);
                Err(SubmitError::Validation(errors))
            }
        }
    }

    /// Check the ticket and unpack the envelope.
    ///
    /// Returns the payload of a `status: true` response. Failures are
    /// recorded for display and wipe the step's passwords.
    fn settle<T>(
        &mut self,
        ticket: SubmitTicket,
        result: Result<ApiResponse<T>, ApiError>,
        fallback: &str,
    ) -> Result<Option<T>, SubmitError> {
        if ticket.generation != self.generation || self.in_flight != Some(ticket) {
            tracing::debug!(step = %ticket.step, ticket = ticket.id, "Discarding stale completion");
            return Err(SubmitError::Stale);
        }
        self.in_flight = None;

        match result {
            Err(e) => {
                tracing::warn!(step = %ticket.step, error = %e, "Auth request failed");
                Err(self.fail(ticket.step, SubmitError::Transport(e)))
            }
            Ok(response) if !response.status => {
                let message = response.message_or(fallback);
                tracing::warn!(step = %ticket.step, message = %message, "Auth request rejected");
                Err(self.fail(ticket.step, SubmitError::Functional { message }))
            }
            Ok(response) => Ok(response.data),
        }
    }

    fn fail(&mut self, step: AuthStep, error: SubmitError) -> SubmitError {
        self.error = Some(error.user_message());
        self.clear_passwords(step);
        error
    }

    fn clear_passwords(&mut self, step: AuthStep) {
        match step {
            AuthStep::Login => self.forms.login.clear_passwords(),
            AuthStep::Signup => self.forms.signup.clear_passwords(),
            AuthStep::ForgotPassword(ResetStep::SetNewPassword) => {
                self.forms.reset_password.clear_passwords();
            }
            AuthStep::ForgotPassword(_) => {}
        }
    }

    /// Close after a terminal success, keeping `notice`.
    fn finish(&mut self, notice: Option<Notice>) {
        self.reset();
        self.notice = notice;
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// # Errors
    ///
    /// `NotOpen`, `WrongStep`, `InFlight` or `Validation`.
    pub fn begin_login(&mut self) -> Result<(SubmitTicket, LoginRequest), SubmitError> {
        self.guard(AuthStep::Login)?;
        let validated = self.forms.login.validate();
        self.start(validated)
    }

    /// Install the session and close the modal on success.
    ///
    /// # Errors
    ///
    /// `Stale`, `Transport` or `Functional`.
    pub fn complete_login(
        &mut self,
        ticket: SubmitTicket,
        result: Result<ApiResponse<LoginData>, ApiError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let data = self.settle(ticket, result, LOGIN_FAILED)?;
        let Some(data) = data else {
            return Err(self.fail(ticket.step, SubmitError::Transport(ApiError::missing_data("log-in"))));
        };

        self.session.login(SessionUser {
            id: data.user.id,
            email: data.user.email,
            name: data.user.name,
            token: data.token,
        });
        self.finish(None);
        Ok(SubmitOutcome::LoggedIn(Navigation::Home))
    }

    /// # Errors
    ///
    /// See [`Self::begin_login`] and [`Self::complete_login`].
    pub async fn submit_login(&mut self) -> Result<SubmitOutcome, SubmitError> {
        let (ticket, request) = self.begin_login()?;
        let result = self.api.log_in(&request).await;
        self.complete_login(ticket, result)
    }

    // =========================================================================
    // Signup
    // =========================================================================

    /// # Errors
    ///
    /// `NotOpen`, `WrongStep`, `InFlight` or `Validation`.
    pub fn begin_signup(&mut self) -> Result<(SubmitTicket, SignupRequest), SubmitError> {
        self.guard(AuthStep::Signup)?;
        let validated = self.forms.signup.validate();
        self.start(validated)
    }

    /// Close the modal with a check-your-email notice on success. The user
    /// is not logged in.
    ///
    /// # Errors
    ///
    /// `Stale`, `Transport` or `Functional`.
    pub fn complete_signup(
        &mut self,
        ticket: SubmitTicket,
        result: Result<crate::api::Ack, ApiError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.settle(ticket, result, SIGNUP_FAILED)?;
        tracing::info!("Signup accepted, awaiting email verification");
        self.finish(Some(Notice::CheckEmail));
        Ok(SubmitOutcome::SignedUp)
    }

    /// # Errors
    ///
    /// See [`Self::begin_signup`] and [`Self::complete_signup`].
    pub async fn submit_signup(&mut self) -> Result<SubmitOutcome, SubmitError> {
        let (ticket, request) = self.begin_signup()?;
        let result = self.api.sign_up(&request).await;
        self.complete_signup(ticket, result)
    }

    // =========================================================================
    // Reset step 1: request code
    // =========================================================================

    /// # Errors
    ///
    /// `NotOpen`, `WrongStep`, `InFlight` or `Validation`.
    pub fn begin_request_code(
        &mut self,
    ) -> Result<(SubmitTicket, ForgotPasswordRequest), SubmitError> {
        self.guard(AuthStep::FORGOT_PASSWORD)?;
        let validated = self.forms.request_code.validate();
        let (ticket, request) = self.start(validated)?;
        self.pending_email = Some(request.email.clone());
        Ok((ticket, request))
    }

    /// Record the verification email and move to step 2 on success.
    ///
    /// # Errors
    ///
    /// `Stale`, `Transport` or `Functional`.
    pub fn complete_request_code(
        &mut self,
        ticket: SubmitTicket,
        result: Result<crate::api::Ack, ApiError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.settle(ticket, result, REQUEST_CODE_FAILED)?;
        self.verification_email = self.pending_email.take();
        self.apply(FlowEvent::CodeRequested);
        Ok(SubmitOutcome::Advanced(self.step))
    }

    /// # Errors
    ///
    /// See [`Self::begin_request_code`] and [`Self::complete_request_code`].
    pub async fn submit_request_code(&mut self) -> Result<SubmitOutcome, SubmitError> {
        let (ticket, request) = self.begin_request_code()?;
        let result = self.api.forgot_password(&request).await;
        self.complete_request_code(ticket, result)
    }

    // =========================================================================
    // Reset step 2: verify code
    // =========================================================================

    /// # Errors
    ///
    /// `NotOpen`, `WrongStep`, `InFlight` or `Validation`.
    pub fn begin_verify_code(&mut self) -> Result<(SubmitTicket, VerifyCodeRequest), SubmitError> {
        let expected = AuthStep::ForgotPassword(ResetStep::VerifyCode);
        self.guard(expected)?;
        let email = self.verification_email.clone().ok_or(SubmitError::WrongStep {
            expected: AuthStep::FORGOT_PASSWORD,
            actual: self.step,
        })?;
        let validated = self.forms.verify_code.validate(&email);
        let (ticket, request) = self.start(validated)?;
        self.pending_code = Some(request.code.clone());
        Ok((ticket, request))
    }

    /// Move to step 3 on success.
    ///
    /// # Errors
    ///
    /// `Stale`, `Transport` or `Functional`.
    pub fn complete_verify_code(
        &mut self,
        ticket: SubmitTicket,
        result: Result<crate::api::Ack, ApiError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.settle(ticket, result, VERIFY_CODE_FAILED)?;
        self.verified_code = self.pending_code.take();
        self.apply(FlowEvent::CodeVerified);
        Ok(SubmitOutcome::Advanced(self.step))
    }

    /// # Errors
    ///
    /// See [`Self::begin_verify_code`] and [`Self::complete_verify_code`].
    pub async fn submit_verify_code(&mut self) -> Result<SubmitOutcome, SubmitError> {
        let (ticket, request) = self.begin_verify_code()?;
        let result = self.api.verify_code(&request).await;
        self.complete_verify_code(ticket, result)
    }

    // =========================================================================
    // Reset step 3: new password
    // =========================================================================

    /// # Errors
    ///
    /// `NotOpen`, `WrongStep`, `InFlight` or `Validation`.
    pub fn begin_reset_password(
        &mut self,
    ) -> Result<(SubmitTicket, ResetPasswordRequest), SubmitError> {
        let expected = AuthStep::ForgotPassword(ResetStep::SetNewPassword);
        self.guard(expected)?;
        let (Some(email), Some(code)) = (self.verification_email.clone(), self.verified_code.clone())
        else {
            return Err(SubmitError::WrongStep {
                expected: AuthStep::ForgotPassword(ResetStep::VerifyCode),
                actual: self.step,
            });
        };
        let validated = self.forms.reset_password.validate(&email, &code);
        self.start(validated)
    }

    /// Leave the reset flow on success, to Login or Done depending on the
    /// configured [`ResetCompletion`].
    ///
    /// # Errors
    ///
    /// `Stale`, `Transport` or `Functional`.
    pub fn complete_reset_password(
        &mut self,
        ticket: SubmitTicket,
        result: Result<crate::api::Ack, ApiError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.settle(ticket, result, RESET_PASSWORD_FAILED)?;

        let email = self.verification_email.take();
        self.verified_code = None;
        self.forms.reset_password.clear_passwords();
        self.forms.verify_code = VerifyCodeForm::default();
        self.apply(FlowEvent::PasswordReset(self.reset_completion));

        if self.step == AuthStep::Login
            && let Some(email) = email
        {
            self.forms.login.email = email.into_inner();
        }
        self.notice = Some(Notice::PasswordReset);
        tracing::info!(step = %self.step, "Password reset completed");
        Ok(SubmitOutcome::PasswordReset(self.step))
    }

    /// # Errors
    ///
    /// See [`Self::begin_reset_password`] and [`Self::complete_reset_password`].
    pub async fn submit_reset_password(&mut self) -> Result<SubmitOutcome, SubmitError> {
        let (ticket, request) = self.begin_reset_password()?;
        let result = self.api.reset_password(&request).await;
        self.complete_reset_password(ticket, result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use secrecy::{ExposeSecret, SecretString};

    use super::*;
    use crate::api::{Ack, ApiUser};
    use crate::session::MemoryStorage;
    use harbor_core::{BearerToken, UserId};

    /// Scripted backend: pops one queued answer per call and records bodies.
    #[derive(Clone, Default)]
    struct FakeAuthApi {
        logins: Arc<Mutex<VecDeque<Result<ApiResponse<LoginData>, ApiError>>>>,
        acks: Arc<Mutex<VecDeque<Result<Ack, ApiError>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeAuthApi {
        fn push_login(&self, answer: Result<ApiResponse<LoginData>, ApiError>) {
            self.logins.lock().unwrap().push_back(answer);
        }

        fn push_ack(&self, answer: Result<Ack, ApiError>) {
            self.acks.lock().unwrap().push_back(answer);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn next_ack(&self, call: String) -> Result<Ack, ApiError> {
            self.calls.lock().unwrap().push(call);
            self.acks
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::ok(None)))
        }
    }

    impl AuthApi for FakeAuthApi {
        async fn log_in(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("log-in {}", request.email));
            self.logins.lock().unwrap().pop_front().unwrap()
        }

        async fn sign_up(&self, request: &SignupRequest) -> Result<Ack, ApiError> {
            self.next_ack(format!("sign-up {}", request.email))
        }

        async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<Ack, ApiError> {
            self.next_ack(format!("forgot-password {}", request.email))
        }

        async fn verify_code(&self, request: &VerifyCodeRequest) -> Result<Ack, ApiError> {
            self.next_ack(format!("verify-code {} {}", request.email, request.code.as_str()))
        }

        async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Ack, ApiError> {
            self.next_ack(format!(
                "reset-password {} {} {}",
                request.email,
                request.code.as_str(),
                request.new_password.expose_secret()
            ))
        }
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn login_data() -> LoginData {
        LoginData {
            user: ApiUser {
                id: UserId::new("42"),
                email: Email::parse("amy@example.com").unwrap(),
                name: Some("Amy".to_string()),
            },
            token: BearerToken::new("tok-42"),
        }
    }

    fn controller_with(
        completion: ResetCompletion,
    ) -> (AuthFlowController<FakeAuthApi>, FakeAuthApi, MemoryStorage) {
        let api = FakeAuthApi::default();
        let storage = MemoryStorage::new();
        let session = SessionStore::open(Arc::new(storage.clone()));
        let mut controller = AuthFlowController::new(api.clone(), session, completion);
        controller.open();
        (controller, api, storage)
    }

    fn controller() -> (AuthFlowController<FakeAuthApi>, FakeAuthApi, MemoryStorage) {
        controller_with(ResetCompletion::ReturnToLogin)
    }

    fn fill_login(controller: &mut AuthFlowController<FakeAuthApi>) {
        let form = &mut controller.forms_mut().login;
        form.email = "amy@example.com".to_string();
        form.password = secret("secret1");
    }

    async fn reach_verify_code(controller: &mut AuthFlowController<FakeAuthApi>) {
        controller.forgot_password();
        controller.forms_mut().request_code.email = "amy@example.com".to_string();
        controller.submit_request_code().await.unwrap();
    }

    async fn reach_new_password(controller: &mut AuthFlowController<FakeAuthApi>) {
        reach_verify_code(controller).await;
        controller.forms_mut().verify_code.code = "123456".to_string();
        controller.submit_verify_code().await.unwrap();
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    #[test]
    fn test_open_starts_at_login() {
        let (controller, _, _) = controller();
        assert!(controller.is_open());
        assert_eq!(controller.step(), AuthStep::Login);
    }

    #[test]
    fn test_reopen_does_not_leak_step() {
        let (mut controller, _, _) = controller();
        assert!(controller.forgot_password());
        assert_eq!(controller.step(), AuthStep::FORGOT_PASSWORD);
        controller.forms_mut().request_code.email = "amy@example.com".to_string();

        controller.close();
        controller.open();
        assert_eq!(controller.step(), AuthStep::Login);
        assert!(controller.forms().request_code.email.is_empty());
    }

    #[test]
    fn test_signup_login_toggle() {
        let (mut controller, _, _) = controller();
        assert!(controller.switch_to_signup());
        assert_eq!(controller.step(), AuthStep::Signup);
        assert!(!controller.forgot_password());
        assert!(controller.switch_to_login());
        assert_eq!(controller.step(), AuthStep::Login);
    }

    #[test]
    fn test_navigation_ignored_while_closed() {
        let (mut controller, _, _) = controller();
        controller.close();
        assert!(!controller.switch_to_signup());
        assert_eq!(controller.step(), AuthStep::Login);
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_success_installs_session_and_closes() {
        let (mut controller, api, storage) = controller();
        api.push_login(Ok(ApiResponse::ok(Some(login_data()))));
        fill_login(&mut controller);
        controller.forms_mut().login.remember_me = true;

        let outcome = controller.submit_login().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::LoggedIn(Navigation::Home));
        assert!(!controller.is_open());

        let session = controller.session();
        assert!(session.is_authenticated());
        assert_eq!(session.token().unwrap().expose(), "tok-42");
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Amy"));

        // Logout clears everything, and a restart agrees
        session.logout();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.token().is_none());
        assert!(!SessionStore::open(Arc::new(storage)).is_authenticated());
    }

    #[tokio::test]
    async fn test_login_functional_failure_keeps_email_wipes_password() {
        let (mut controller, api, _) = controller();
        api.push_login(Ok(ApiResponse::failure("Wrong password")));
        fill_login(&mut controller);

        let err = controller.submit_login().await.unwrap_err();
        assert!(matches!(err, SubmitError::Functional { ref message } if message == "Wrong password"));
        assert_eq!(controller.error(), Some("Wrong password"));
        assert_eq!(controller.step(), AuthStep::Login);
        assert!(controller.is_open());
        assert_eq!(controller.forms().login.email, "amy@example.com");
        assert!(controller.forms().login.password.expose_secret().is_empty());
        assert!(!controller.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_failure_without_message_uses_fallback() {
        let (mut controller, api, _) = controller();
        api.push_login(Ok(ApiResponse {
            status: false,
            message: None,
            data: None,
        }));
        fill_login(&mut controller);
        controller.submit_login().await.unwrap_err();
        assert_eq!(controller.error(), Some(LOGIN_FAILED));
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_message() {
        let (mut controller, api, _) = controller();
        api.push_login(Err(ApiError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        }));
        fill_login(&mut controller);

        let err = controller.submit_login().await.unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
        assert_eq!(controller.error(), Some(crate::error::CONNECTION_PROBLEM));
        assert!(controller.forms().login.password.expose_secret().is_empty());
    }

    #[tokio::test]
    async fn test_login_success_without_data_is_transport_failure() {
        let (mut controller, api, _) = controller();
        api.push_login(Ok(ApiResponse::ok(None)));
        fill_login(&mut controller);

        let err = controller.submit_login().await.unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
        assert!(!controller.session().is_authenticated());
        assert!(controller.is_open());
    }

    #[tokio::test]
    async fn test_validation_failure_never_calls_api() {
        let (mut controller, api, _) = controller();
        controller.forms_mut().login.email = "not-an-email".to_string();
        controller.forms_mut().login.password = secret("abc");

        let err = controller.submit_login().await.unwrap_err();
        let SubmitError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(controller.field_errors().len(), 2);
        assert!(api.calls().is_empty());
        assert_eq!(controller.forms().login.email, "not-an-email");
    }

    #[test]
    fn test_second_submit_while_in_flight_is_refused() {
        let (mut controller, _, _) = controller();
        fill_login(&mut controller);
        let (ticket, _request) = controller.begin_login().unwrap();
        assert!(controller.is_submitting());

        // Inputs remain editable
        controller.forms_mut().login.remember_me = true;
        assert!(matches!(controller.begin_login(), Err(SubmitError::InFlight)));
        assert!(!controller.forms().login.password.expose_secret().is_empty());

        let outcome = controller
            .complete_login(ticket, Ok(ApiResponse::ok(Some(login_data()))))
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::LoggedIn(Navigation::Home));
    }

    #[test]
    fn test_completion_after_close_is_discarded() {
        let (mut controller, _, _) = controller();
        fill_login(&mut controller);
        let (ticket, _) = controller.begin_login().unwrap();

        controller.close();
        controller.open();

        let err = controller
            .complete_login(ticket, Ok(ApiResponse::ok(Some(login_data()))))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Stale));
        assert!(!controller.session().is_authenticated());
        assert!(controller.is_open());
    }

    #[test]
    fn test_submit_requires_open_modal_and_step() {
        let (mut controller, _, _) = controller();
        assert!(matches!(
            controller.begin_signup(),
            Err(SubmitError::WrongStep { .. })
        ));
        controller.close();
        assert!(matches!(controller.begin_login(), Err(SubmitError::NotOpen)));
    }

    // -------------------------------------------------------------------------
    // Signup
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_signup_success_does_not_log_in() {
        let (mut controller, api, _) = controller();
        controller.switch_to_signup();
        let form = &mut controller.forms_mut().signup;
        form.email = "new@example.com".to_string();
        form.password = secret("Passw0rdX");
        form.confirm_password = secret("Passw0rdX");

        let outcome = controller.submit_signup().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::SignedUp);
        assert!(!controller.is_open());
        assert_eq!(controller.notice(), Some(Notice::CheckEmail));
        assert!(!controller.session().is_authenticated());
        assert_eq!(api.calls(), vec!["sign-up new@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_signup_failure_wipes_both_passwords() {
        let (mut controller, api, _) = controller();
        api.push_ack(Ok(ApiResponse::failure("Email already registered")));
        controller.switch_to_signup();
        let form = &mut controller.forms_mut().signup;
        form.email = "new@example.com".to_string();
        form.password = secret("Passw0rdX");
        form.confirm_password = secret("Passw0rdX");

        controller.submit_signup().await.unwrap_err();
        let form = &controller.forms().signup;
        assert_eq!(form.email, "new@example.com");
        assert!(form.password.expose_secret().is_empty());
        assert!(form.confirm_password.expose_secret().is_empty());
        assert_eq!(controller.error(), Some("Email already registered"));
    }

    // -------------------------------------------------------------------------
    // Forgot password
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_request_code_failure_stays_on_step_one() {
        let (mut controller, api, _) = controller();
        api.push_ack(Ok(ApiResponse::failure("X")));
        controller.forgot_password();
        controller.forms_mut().request_code.email = "amy@example.com".to_string();

        let err = controller.submit_request_code().await.unwrap_err();
        assert_eq!(err.user_message(), "X");
        assert_eq!(controller.step(), AuthStep::FORGOT_PASSWORD);
        assert_eq!(controller.error(), Some("X"));
        assert!(controller.verification_email().is_none());
    }

    #[tokio::test]
    async fn test_request_code_success_records_email() {
        let (mut controller, _, _) = controller();
        reach_verify_code(&mut controller).await;
        assert_eq!(
            controller.step(),
            AuthStep::ForgotPassword(ResetStep::VerifyCode)
        );
        assert_eq!(
            controller.verification_email().unwrap().as_str(),
            "amy@example.com"
        );
        assert!(controller.error().is_none());
    }

    #[tokio::test]
    async fn test_verification_email_threads_through_steps() {
        let (mut controller, api, _) = controller();
        reach_verify_code(&mut controller).await;
        // Editing step 1's field later does not change the captured email
        controller.forms_mut().request_code.email = "other@example.com".to_string();
        controller.forms_mut().verify_code.code = "654321".to_string();
        controller.submit_verify_code().await.unwrap();

        let form = &mut controller.forms_mut().reset_password;
        form.password = secret("NewPass12");
        form.confirm_password = secret("NewPass12");
        controller.submit_reset_password().await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                "forgot-password amy@example.com".to_string(),
                "verify-code amy@example.com 654321".to_string(),
                "reset-password amy@example.com 654321 NewPass12".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_verify_code_failure_stays_on_step_two() {
        let (mut controller, api, _) = controller();
        reach_verify_code(&mut controller).await;
        api.push_ack(Ok(ApiResponse::failure("Code expired")));
        controller.forms_mut().verify_code.code = "123456".to_string();

        controller.submit_verify_code().await.unwrap_err();
        assert_eq!(
            controller.step(),
            AuthStep::ForgotPassword(ResetStep::VerifyCode)
        );
        assert_eq!(controller.error(), Some("Code expired"));
    }

    #[tokio::test]
    async fn test_back_navigation() {
        let (mut controller, _, _) = controller();
        reach_new_password(&mut controller).await;
        assert!(controller.back());
        assert_eq!(
            controller.step(),
            AuthStep::ForgotPassword(ResetStep::VerifyCode)
        );
        assert!(controller.back());
        assert_eq!(controller.step(), AuthStep::FORGOT_PASSWORD);
        assert_eq!(controller.forms().request_code.email, "amy@example.com");
    }

    #[tokio::test]
    async fn test_back_discards_in_flight_completion() {
        let (mut controller, _, _) = controller();
        reach_verify_code(&mut controller).await;
        controller.forms_mut().verify_code.code = "123456".to_string();
        let (ticket, _) = controller.begin_verify_code().unwrap();

        controller.back();
        let err = controller
            .complete_verify_code(ticket, Ok(ApiResponse::ok(None)))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Stale));
        assert_eq!(controller.step(), AuthStep::FORGOT_PASSWORD);
    }

    #[tokio::test]
    async fn test_reset_success_returns_to_login_with_notice() {
        let (mut controller, _, _) = controller();
        reach_new_password(&mut controller).await;
        let form = &mut controller.forms_mut().reset_password;
        form.password = secret("NewPass12");
        form.confirm_password = secret("NewPass12");

        let outcome = controller.submit_reset_password().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::PasswordReset(AuthStep::Login));
        assert_eq!(controller.step(), AuthStep::Login);
        assert!(controller.is_open());
        assert_eq!(controller.notice(), Some(Notice::PasswordReset));
        assert_eq!(controller.forms().login.email, "amy@example.com");
        assert!(controller.verification_email().is_none());
        assert!(
            controller
                .forms()
                .reset_password
                .password
                .expose_secret()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_reset_success_can_show_done() {
        let (mut controller, _, _) = controller_with(ResetCompletion::ShowDone);
        reach_new_password(&mut controller).await;
        let form = &mut controller.forms_mut().reset_password;
        form.password = secret("NewPass12");
        form.confirm_password = secret("NewPass12");

        let outcome = controller.submit_reset_password().await.unwrap();
        let done = AuthStep::ForgotPassword(ResetStep::Done);
        assert_eq!(outcome, SubmitOutcome::PasswordReset(done));
        assert!(controller.continue_to_login());
        assert_eq!(controller.step(), AuthStep::Login);
    }

    #[tokio::test]
    async fn test_reset_failure_wipes_new_password() {
        let (mut controller, api, _) = controller();
        reach_new_password(&mut controller).await;
        api.push_ack(Err(ApiError::Unauthorized));
        let form = &mut controller.forms_mut().reset_password;
        form.password = secret("NewPass12");
        form.confirm_password = secret("NewPass12");

        controller.submit_reset_password().await.unwrap_err();
        assert_eq!(
            controller.step(),
            AuthStep::ForgotPassword(ResetStep::SetNewPassword)
        );
        assert!(
            controller
                .forms()
                .reset_password
                .confirm_password
                .expose_secret()
                .is_empty()
        );
    }

    #[test]
    fn test_take_notice() {
        let (mut controller, _, _) = controller();
        controller.notice = Some(Notice::CheckEmail);
        assert_eq!(controller.take_notice(), Some(Notice::CheckEmail));
        assert_eq!(controller.notice(), None);
    }
}
