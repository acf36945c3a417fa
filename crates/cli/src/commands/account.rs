//! Account commands: login, signup, password reset and session inspection.
//!
//! Each command opens a fresh auth flow on the shared session, fills the
//! form for the current step and submits it. Mistakes the user can fix
//! (bad input, a wrong code) are re-prompted a few times before giving up.

use harbor_storefront::api::StorefrontApiClient;
use harbor_storefront::auth::{AuthFlowController, AuthStep, SubmitError, SubmitOutcome};
use harbor_storefront::{AppError, AppState};

use super::prompt;

/// Attempts allowed for a step the user can retry.
const MAX_ATTEMPTS: usize = 3;

type Flow = AuthFlowController<StorefrontApiClient>;

/// Log in and persist the session.
///
/// # Errors
///
/// Returns an error if input cannot be read or the backend refuses the login.
#[allow(clippy::print_stdout)]
pub async fn login(
    state: &AppState,
    email: Option<String>,
    remember_me: bool,
) -> Result<(), AppError> {
    let mut flow = state.auth_flow();
    flow.open();

    let form = &mut flow.forms_mut().login;
    form.email = prompt::or_ask(email, "Email")?;
    form.remember_me = remember_me;

    retry(&mut flow, |flow| {
        Box::pin(async move {
            flow.forms_mut().login.password = prompt::secret("Password")?;
            Ok(flow.submit_login().await)
        })
    })
    .await?;

    if let Some(user) = state.session().user() {
        println!("Logged in as {}", user.email);
    }
    Ok(())
}

/// Create an account. The new account is not logged in.
///
/// # Errors
///
/// Returns an error if input cannot be read or the backend refuses the signup.
#[allow(clippy::print_stdout)]
pub async fn signup(state: &AppState, email: Option<String>) -> Result<(), AppError> {
    let mut flow = state.auth_flow();
    flow.open();
    flow.switch_to_signup();

    flow.forms_mut().signup.email = prompt::or_ask(email, "Email")?;

    retry(&mut flow, |flow| {
        Box::pin(async move {
            let form = &mut flow.forms_mut().signup;
            form.password = prompt::secret("Password")?;
            form.confirm_password = prompt::secret("Confirm password")?;
            Ok(flow.submit_signup().await)
        })
    })
    .await?;

    if let Some(notice) = flow.take_notice() {
        println!("{}", notice.message());
    }
    Ok(())
}

/// Walk the three reset steps: request a code, verify it, set a password.
///
/// # Errors
///
/// Returns an error if input cannot be read or any step is refused.
#[allow(clippy::print_stdout)]
pub async fn forgot_password(state: &AppState, email: Option<String>) -> Result<(), AppError> {
    let mut flow = state.auth_flow();
    flow.open();
    flow.forgot_password();

    flow.forms_mut().request_code.email = prompt::or_ask(email, "Email")?;
    flow.submit_request_code().await?;
    if let Some(email) = flow.verification_email() {
        println!("A verification code has been sent to {email}");
    }

    retry(&mut flow, |flow| {
        Box::pin(async move {
            flow.forms_mut().verify_code.code = prompt::line("Code")?;
            Ok(flow.submit_verify_code().await)
        })
    })
    .await?;

    let outcome = retry(&mut flow, |flow| {
        Box::pin(async move {
            let form = &mut flow.forms_mut().reset_password;
            form.password = prompt::secret("New password")?;
            form.confirm_password = prompt::secret("Confirm password")?;
            Ok(flow.submit_reset_password().await)
        })
    })
    .await?;

    if let Some(notice) = flow.take_notice() {
        println!("{}", notice.message());
    }
    if let SubmitOutcome::PasswordReset(AuthStep::Login) = outcome {
        println!("Run `harbor login` to continue.");
    }
    Ok(())
}

/// Forget the stored session.
#[allow(clippy::print_stdout)]
pub fn logout(state: &AppState) {
    let session = state.session();
    if session.is_authenticated() {
        session.logout();
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
}

/// Print the logged-in user.
#[allow(clippy::print_stdout)]
pub fn whoami(state: &AppState) {
    match state.session().user() {
        Some(user) => {
            println!("{} ({})", user.email, user.id);
            if let Some(name) = &user.name {
                println!("Name: {name}");
            }
            if !state.session().is_durable() {
                println!("Warning: local storage is unavailable; the session will not be kept");
            }
        }
        None => println!("Not logged in"),
    }
}

// =============================================================================
// Retry
// =============================================================================

type Attempt<'a> = std::pin::Pin<
    Box<dyn Future<Output = Result<Result<SubmitOutcome, SubmitError>, AppError>> + 'a>,
>;

/// Run `attempt` until it succeeds, fails in a way the user cannot fix, or
/// runs out of attempts.
async fn retry<F>(flow: &mut Flow, mut attempt: F) -> Result<SubmitOutcome, AppError>
where
    F: for<'a> FnMut(&'a mut Flow) -> Attempt<'a>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt(flow).await? {
            Ok(outcome) => return Ok(outcome),
            Err(e) if is_correctable(&e) && attempts < MAX_ATTEMPTS => {
                super::print_failure(&AppError::Auth(e));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

const fn is_correctable(error: &SubmitError) -> bool {
    matches!(
        error,
        SubmitError::Validation(_) | SubmitError::Functional { .. }
    )
}
