//! Request and response bodies for the storefront backend.
//!
//! Field names follow the backend's camelCase JSON. Password fields are held
//! as [`SecretString`] so request values never print them; they are exposed
//! only while serializing the body.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use harbor_core::{BearerToken, Email, UserId, VerificationCode};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/users/log-in`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Email,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

/// Body of `POST /api/users/sign-up`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: Email,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// Body of `POST /api/users/forgot-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: Email,
}

/// Body of `POST /api/users/verify-code`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeRequest {
    pub email: Email,
    pub code: VerificationCode,
}

/// Body of `POST /api/users/reset-password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: Email,
    pub code: VerificationCode,
    #[serde(serialize_with = "expose")]
    pub new_password: SecretString,
}

/// Body of `PUT /api/users/profile`.
///
/// Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// User identity returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub name: Option<String>,
}

/// `data` of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub user: ApiUser,
    pub token: BearerToken,
}

/// `data` of the profile endpoints.
///
/// The address is stored by the backend as a single line; see
/// [`crate::profile::PostalAddress`] for its structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}
