//! Storefront backend API.
//!
//! # Architecture
//!
//! - Every endpoint answers with the same JSON envelope,
//!   `{"status": bool, "message": string?, "data": T?}` ([`ApiResponse`])
//! - The auth flow and the profile loader talk to the backend through the
//!   [`AuthApi`] and [`ProfileApi`] traits so they can be driven by fakes in
//!   tests
//! - [`StorefrontApiClient`] is the `reqwest` implementation of both
//!
//! # Endpoints
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/api/users/log-in` | - |
//! | POST | `/api/users/sign-up` | - |
//! | POST | `/api/users/forgot-password` | - |
//! | POST | `/api/users/verify-code` | - |
//! | POST | `/api/users/reset-password` | - |
//! | GET | `/api/users/profile` | Bearer |
//! | PUT | `/api/users/profile` | Bearer |

mod client;
pub mod types;

pub use client::StorefrontApiClient;
pub use types::*;

use std::future::Future;

use harbor_core::BearerToken;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
///
/// Everything except [`ApiError::Unauthorized`] is a transport failure: no
/// usable envelope came back.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not a valid envelope.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An authenticated request was rejected with 401.
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success HTTP status without a parsable envelope.
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Endpoint URL could not be built from the base URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether this is a transport-level failure (no response to show).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        !matches!(self, Self::Unauthorized)
    }

    /// A successful envelope that lacks the payload the endpoint promises.
    #[must_use]
    pub fn missing_data(endpoint: &str) -> Self {
        Self::Parse(serde::de::Error::custom(format!(
            "{endpoint} response has no data"
        )))
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiResponse<T> {
    /// `true` when the operation succeeded.
    pub status: bool,
    /// Human-readable message, usually present on failure.
    #[serde(default)]
    pub message: Option<String>,
    /// Payload, present on success for endpoints that return data.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful envelope carrying `data`.
    pub const fn ok(data: Option<T>) -> Self {
        Self {
            status: true,
            message: None,
            data,
        }
    }

    /// A failed envelope carrying a server message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// The server message if it is present and not blank, else `fallback`.
    #[must_use]
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Envelope for endpoints whose payload the client does not read.
pub type Ack = ApiResponse<serde_json::Value>;

/// Unauthenticated account endpoints used by the authentication flow.
pub trait AuthApi: Send + Sync {
    /// `POST /api/users/log-in`
    fn log_in(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<ApiResponse<LoginData>, ApiError>> + Send;

    /// `POST /api/users/sign-up`
    fn sign_up(
        &self,
        request: &SignupRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>> + Send;

    /// `POST /api/users/forgot-password`
    fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>> + Send;

    /// `POST /api/users/verify-code`
    fn verify_code(
        &self,
        request: &VerifyCodeRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>> + Send;

    /// `POST /api/users/reset-password`
    fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> impl Future<Output = Result<Ack, ApiError>> + Send;
}

/// Bearer-authenticated profile endpoints.
pub trait ProfileApi: Send + Sync {
    /// `GET /api/users/profile`
    fn fetch_profile(
        &self,
        token: &BearerToken,
    ) -> impl Future<Output = Result<ApiResponse<ProfileData>, ApiError>> + Send;

    /// `PUT /api/users/profile`
    fn update_profile(
        &self,
        token: &BearerToken,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<ApiResponse<ProfileData>, ApiError>> + Send;
}
