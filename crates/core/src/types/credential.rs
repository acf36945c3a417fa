//! Credential types.
//!
//! Type-safe wrappers for the bearer token issued at login and the one-time
//! code used during password recovery.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Bearer token issued by the backend on login.
///
/// The token is opaque: it is never parsed, and its `Debug` output is
/// redacted so it cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Format as an `Authorization` header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Errors produced when parsing a [`VerificationCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The code is empty.
    #[error("verification code cannot be empty")]
    Empty,
    /// The code does not have exactly the required number of characters.
    #[error("verification code must be exactly {expected} characters")]
    WrongLength {
        /// Required length.
        expected: usize,
    },
}

/// One-time verification code emailed during password recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Required number of characters.
    pub const LENGTH: usize = 6;

    /// Parse a code, requiring exactly [`Self::LENGTH`] characters.
    ///
    /// # Errors
    ///
    /// Returns `CodeError::Empty` or `CodeError::WrongLength`.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        if s.is_empty() {
            return Err(CodeError::Empty);
        }
        if s.chars().count() != Self::LENGTH {
            return Err(CodeError::WrongLength {
                expected: Self::LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VerificationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
