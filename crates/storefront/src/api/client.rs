//! `reqwest` implementation of the storefront backend API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use harbor_core::BearerToken;

use super::{
    Ack, ApiError, ApiResponse, AuthApi, ForgotPasswordRequest, LoginData, LoginRequest,
    ProfileApi, ProfileData, ProfileUpdate, ResetPasswordRequest, SignupRequest,
    VerifyCodeRequest,
};

const LOG_IN_PATH: &str = "api/users/log-in";
const SIGN_UP_PATH: &str = "api/users/sign-up";
const FORGOT_PASSWORD_PATH: &str = "api/users/forgot-password";
const VERIFY_CODE_PATH: &str = "api/users/verify-code";
const RESET_PASSWORD_PATH: &str = "api/users/reset-password";
const PROFILE_PATH: &str = "api/users/profile";

/// Maximum number of body characters copied into logs and errors.
const BODY_PREVIEW_CHARS: usize = 500;

// =============================================================================
// StorefrontApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct StorefrontApiClient {
    inner: Arc<StorefrontApiClientInner>,
}

struct StorefrontApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl StorefrontApiClient {
    /// Create a new client for the backend at `base_url`.
    ///
    /// `timeout` is applied to every request when set; otherwise the
    /// `reqwest` default (no timeout) applies.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(StorefrontApiClientInner {
                client: builder.build()?,
                base_url: normalize_base_url(base_url),
            }),
        })
    }

    /// The backend origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Send a request and decode the response envelope.
    ///
    /// A parsable envelope is returned as-is whatever the HTTP status, so
    /// `status: false` answers sent with 4xx codes still reach the caller as
    /// functional failures. A 401 on an authenticated request is reported
    /// as [`ApiError::Unauthorized`].
    async fn execute<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&BearerToken>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.inner.base_url.join(path)?;

        let mut request = self.inner.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && token.is_some() {
            return Err(ApiError::Unauthorized);
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&response_text) {
            Ok(envelope) => {
                debug!(
                    status = %status,
                    ok = envelope.status,
                    "Backend responded"
                );
                Ok(envelope)
            }
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %preview(&response_text),
                    "Failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
            Err(_) => {
                tracing::error!(
                    status = %status,
                    body = %preview(&response_text),
                    "Backend returned non-success status"
                );
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body: preview(&response_text),
                })
            }
        }
    }
}

impl AuthApi for StorefrontApiClient {
    #[instrument(skip_all, fields(email = %request.email))]
    async fn log_in(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>, ApiError> {
        self.execute(Method::POST, LOG_IN_PATH, Some(request), None)
            .await
    }

    #[instrument(skip_all, fields(email = %request.email))]
    async fn sign_up(&self, request: &SignupRequest) -> Result<Ack, ApiError> {
        self.execute(Method::POST, SIGN_UP_PATH, Some(request), None)
            .await
    }

    #[instrument(skip_all, fields(email = %request.email))]
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<Ack, ApiError> {
        self.execute(Method::POST, FORGOT_PASSWORD_PATH, Some(request), None)
            .await
    }

    #[instrument(skip_all, fields(email = %request.email))]
    async fn verify_code(&self, request: &VerifyCodeRequest) -> Result<Ack, ApiError> {
        self.execute(Method::POST, VERIFY_CODE_PATH, Some(request), None)
            .await
    }

    #[instrument(skip_all, fields(email = %request.email))]
    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Ack, ApiError> {
        self.execute(Method::POST, RESET_PASSWORD_PATH, Some(request), None)
            .await
    }
}

impl ProfileApi for StorefrontApiClient {
    #[instrument(skip_all)]
    async fn fetch_profile(
        &self,
        token: &BearerToken,
    ) -> Result<ApiResponse<ProfileData>, ApiError> {
        self.execute::<(), _>(Method::GET, PROFILE_PATH, None, Some(token))
            .await
    }

    #[instrument(skip_all)]
    async fn update_profile(
        &self,
        token: &BearerToken,
        update: &ProfileUpdate,
    ) -> Result<ApiResponse<ProfileData>, ApiError> {
        self.execute(Method::PUT, PROFILE_PATH, Some(update), Some(token))
            .await
    }
}

/// Ensure the base URL ends with `/` so relative joins keep any path prefix.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
