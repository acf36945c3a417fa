//! Per-step form values and client-side validation.
//!
//! Validation runs before any network call and yields either the owned
//! request body for the step or field-scoped [`FieldErrors`]. Password
//! values are [`SecretString`]s and can be wiped with `clear_passwords`;
//! email fields are never wiped.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use harbor_core::{Email, PasswordPolicy, VerificationCode};

use crate::api::{
    ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest, VerifyCodeRequest,
};

const PASSWORDS_DIFFER: &str = "passwords do not match";

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

// =============================================================================
// Field errors
// =============================================================================

/// Form field an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    Code,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::Code => "code",
        }
    }
}

/// Validation errors keyed by field, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<(Field, String)>,
}

impl FieldErrors {
    fn push(&mut self, field: Field, message: impl fmt::Display) {
        self.errors.push((field, message.to_string()));
    }

    fn into_result<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, Self> {
        if self.errors.is_empty() {
            value().ok_or(self)
        } else {
            Err(self)
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The error for `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {message}", field.as_str())?;
        }
        Ok(())
    }
}

fn check_email(raw: &str, errors: &mut FieldErrors) -> Option<Email> {
    Email::parse(raw.trim())
        .map_err(|e| errors.push(Field::Email, e))
        .ok()
}

fn check_new_password(password: &SecretString, confirm: &SecretString, errors: &mut FieldErrors) {
    if let Err(e) = PasswordPolicy::NEW_PASSWORD.check(password.expose_secret()) {
        errors.push(Field::Password, e);
    }
    if password.expose_secret() != confirm.expose_secret() {
        errors.push(Field::ConfirmPassword, PASSWORDS_DIFFER);
    }
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
    pub remember_me: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: empty_secret(),
            remember_me: false,
        }
    }
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns the field errors if the email is malformed or the password is
    /// shorter than 6 characters.
    pub fn validate(&self) -> Result<LoginRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&self.email, &mut errors);
        if let Err(e) = PasswordPolicy::LOGIN.check(self.password.expose_secret()) {
            errors.push(Field::Password, e);
        }
        errors.into_result(|| {
            Some(LoginRequest {
                email: email?,
                password: self.password.clone(),
                remember_me: self.remember_me.then_some(true),
            })
        })
    }

    pub fn clear_passwords(&mut self) {
        self.password = empty_secret();
    }
}

#[derive(Debug, Clone)]
pub struct SignupForm {
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl Default for SignupForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: empty_secret(),
            confirm_password: empty_secret(),
        }
    }
}

impl SignupForm {
    /// # Errors
    ///
    /// Returns the field errors if the email is malformed, the password
    /// breaks the new-password policy, or the confirmation differs.
    pub fn validate(&self) -> Result<SignupRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&self.email, &mut errors);
        check_new_password(&self.password, &self.confirm_password, &mut errors);
        errors.into_result(|| {
            Some(SignupRequest {
                email: email?,
                password: self.password.clone(),
            })
        })
    }

    pub fn clear_passwords(&mut self) {
        self.password = empty_secret();
        self.confirm_password = empty_secret();
    }
}

/// Step 1 of the reset flow.
#[derive(Debug, Clone, Default)]
pub struct RequestCodeForm {
    pub email: String,
}

impl RequestCodeForm {
    /// # Errors
    ///
    /// Returns the field errors if the email is malformed.
    pub fn validate(&self) -> Result<ForgotPasswordRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&self.email, &mut errors);
        errors.into_result(|| Some(ForgotPasswordRequest { email: email? }))
    }
}

/// Step 2 of the reset flow. The email comes from step 1.
#[derive(Debug, Clone, Default)]
pub struct VerifyCodeForm {
    pub code: String,
}

impl VerifyCodeForm {
    /// # Errors
    ///
    /// Returns the field errors if the code is not exactly 6 characters.
    pub fn validate(&self, email: &Email) -> Result<VerifyCodeRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        let code = VerificationCode::parse(self.code.trim())
            .map_err(|e| errors.push(Field::Code, e))
            .ok();
        errors.into_result(|| {
            Some(VerifyCodeRequest {
                email: email.clone(),
                code: code?,
            })
        })
    }
}

/// Step 3 of the reset flow. Email and code come from earlier steps.
#[derive(Debug, Clone)]
pub struct ResetPasswordForm {
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl Default for ResetPasswordForm {
    fn default() -> Self {
        Self {
            password: empty_secret(),
            confirm_password: empty_secret(),
        }
    }
}

impl ResetPasswordForm {
    /// # Errors
    ///
    /// Returns the field errors if the password breaks the new-password
    /// policy or the confirmation differs.
    pub fn validate(
        &self,
        email: &Email,
        code: &VerificationCode,
    ) -> Result<ResetPasswordRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        check_new_password(&self.password, &self.confirm_password, &mut errors);
        errors.into_result(|| {
            Some(ResetPasswordRequest {
                email: email.clone(),
                code: code.clone(),
                new_password: self.password.clone(),
            })
        })
    }

    pub fn clear_passwords(&mut self) {
        self.password = empty_secret();
        self.confirm_password = empty_secret();
    }
}
