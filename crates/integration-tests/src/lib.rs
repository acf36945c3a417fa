//! End-to-end tests for the Harbor storefront core.
//!
//! [`MockBackend`] serves the seven account and profile endpoints from
//! memory on an ephemeral port, so the real HTTP client, the file-backed
//! session and the auth flow can be exercised together.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p harbor-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - login, signup and the three-step password reset
//! - `profile` - profile load/save and token expiry
//! - `restart` - session and cart surviving a process restart

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

use harbor_storefront::config::StorefrontConfig;

/// Code the mock backend "emails" for every password reset.
pub const RESET_CODE: &str = "482913";

#[derive(Debug, Clone)]
struct Account {
    id: u64,
    email: String,
    password: String,
    name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    verified: bool,
}

impl Account {
    fn profile_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "name": self.name,
            "phone": self.phone,
            "address": self.address,
        })
    }
}

#[derive(Debug, Default)]
struct Backend {
    accounts: HashMap<String, Account>,
    reset_codes: HashMap<String, String>,
    tokens: HashMap<String, String>,
    next_id: u64,
    next_token: u64,
    unavailable: bool,
    bare_profile_updates: bool,
    hits: HashMap<String, usize>,
}

impl Backend {
    fn create(&mut self, email: &str, password: &str, verified: bool) -> u64 {
        self.next_id += 1;
        let key = email.to_lowercase();
        self.accounts.insert(
            key.clone(),
            Account {
                id: self.next_id,
                email: key,
                password: password.to_string(),
                name: None,
                phone: None,
                address: None,
                verified,
            },
        );
        self.next_id
    }

    fn issue_token(&mut self, account: &Account) -> String {
        self.next_token += 1;
        let token = format!("token-{}-{}", account.id, self.next_token);
        self.tokens.insert(token.clone(), account.email.clone());
        token
    }

    fn bearer_account(&mut self, headers: &HeaderMap) -> Option<&mut Account> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))?;
        let email = self.tokens.get(token)?.clone();
        self.accounts.get_mut(&email)
    }
}

type Shared = Arc<Mutex<Backend>>;

/// In-memory storefront backend bound to `127.0.0.1` on a free port.
///
/// The server task is aborted on drop.
pub struct MockBackend {
    url: Url,
    backend: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> io::Result<Self> {
        let backend = Shared::default();
        let app = router(Arc::clone(&backend));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{addr}/")).map_err(io::Error::other)?;

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });
        tracing::debug!(%url, "Mock backend listening");

        Ok(Self {
            url,
            backend,
            server,
        })
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Client configuration pointing at this backend, storing state in `state_dir`.
    #[must_use]
    pub fn config(&self, state_dir: &Path) -> StorefrontConfig {
        StorefrontConfig::new(self.url.clone(), state_dir.to_path_buf())
    }

    /// Register a verified account. Returns its id.
    pub async fn add_account(&self, email: &str, password: &str) -> u64 {
        self.backend.lock().await.create(email, password, true)
    }

    /// Set the stored profile fields of an account.
    pub async fn set_profile(&self, email: &str, name: &str, phone: &str, address: &str) {
        let mut backend = self.backend.lock().await;
        if let Some(account) = backend.accounts.get_mut(&email.to_lowercase()) {
            account.name = Some(name.to_string());
            account.phone = Some(phone.to_string());
            account.address = Some(address.to_string());
        }
    }

    /// Mark a signed-up account as verified. Returns whether it exists.
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut backend = self.backend.lock().await;
        backend
            .accounts
            .get_mut(&email.to_lowercase())
            .map(|account| account.verified = true)
            .is_some()
    }

    pub async fn account_exists(&self, email: &str) -> bool {
        self.backend
            .lock()
            .await
            .accounts
            .contains_key(&email.to_lowercase())
    }

    pub async fn password_of(&self, email: &str) -> Option<String> {
        let backend = self.backend.lock().await;
        backend
            .accounts
            .get(&email.to_lowercase())
            .map(|account| account.password.clone())
    }

    pub async fn stored_address(&self, email: &str) -> Option<String> {
        let backend = self.backend.lock().await;
        backend
            .accounts
            .get(&email.to_lowercase())
            .and_then(|account| account.address.clone())
    }

    /// Invalidate every issued token, so authenticated calls get 401.
    pub async fn revoke_tokens(&self) {
        self.backend.lock().await.tokens.clear();
    }

    /// Answer every request with a 503 HTML page while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.backend.lock().await.unavailable = unavailable;
    }

    /// Answer profile updates with an envelope that carries no data.
    pub async fn set_bare_profile_updates(&self, bare: bool) {
        self.backend.lock().await.bare_profile_updates = bare;
    }

    /// Requests received for `path`, including refused ones.
    pub async fn hits(&self, path: &str) -> usize {
        self.backend
            .lock()
            .await
            .hits
            .get(path)
            .copied()
            .unwrap_or_default()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(backend: Shared) -> Router {
    Router::new()
        .route("/api/users/log-in", post(log_in))
        .route("/api/users/sign-up", post(sign_up))
        .route("/api/users/forgot-password", post(forgot_password))
        .route("/api/users/verify-code", post(verify_code))
        .route("/api/users/reset-password", post(reset_password))
        .route("/api/users/profile", get(fetch_profile).put(update_profile))
        .layer(middleware::from_fn_with_state(Arc::clone(&backend), gate))
        .with_state(backend)
}

/// Count the request, and refuse it while the backend is unavailable.
async fn gate(State(backend): State<Shared>, request: Request, next: Next) -> Response {
    {
        let mut backend = backend.lock().await;
        *backend
            .hits
            .entry(request.uri().path().to_string())
            .or_default() += 1;
        if backend.unavailable {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "<html><body>Service Unavailable</body></html>",
            )
                .into_response();
        }
    }
    next.run(request).await
}

fn ok(data: Value) -> Response {
    Json(json!({ "status": true, "data": data })).into_response()
}

fn ack() -> Response {
    Json(json!({ "status": true })).into_response()
}

fn refuse(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": false, "message": message }))).into_response()
}

fn unauthorized() -> Response {
    refuse(StatusCode::UNAUTHORIZED, "Unauthorized")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    email: String,
    password: String,
}

async fn log_in(State(backend): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut backend = backend.lock().await;
    let account = match backend.accounts.get(&body.email.to_lowercase()) {
        Some(account) if account.password == body.password => account.clone(),
        _ => return refuse(StatusCode::BAD_REQUEST, "Invalid email or password"),
    };
    if !account.verified {
        return refuse(
            StatusCode::FORBIDDEN,
            "Please verify your email before logging in",
        );
    }

    let token = backend.issue_token(&account);
    ok(json!({
        "user": { "id": account.id, "email": account.email, "name": account.name },
        "token": token,
    }))
}

async fn sign_up(State(backend): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut backend = backend.lock().await;
    if backend.accounts.contains_key(&body.email.to_lowercase()) {
        return refuse(StatusCode::CONFLICT, "This email is already registered");
    }
    backend.create(&body.email, &body.password, false);
    ack()
}

#[derive(Debug, Deserialize)]
struct EmailOnly {
    email: String,
}

async fn forgot_password(State(backend): State<Shared>, Json(body): Json<EmailOnly>) -> Response {
    let mut backend = backend.lock().await;
    let email = body.email.to_lowercase();
    if !backend.accounts.contains_key(&email) {
        return refuse(StatusCode::NOT_FOUND, "No account uses this email");
    }
    backend.reset_codes.insert(email, RESET_CODE.to_string());
    ack()
}

#[derive(Debug, Deserialize)]
struct CodeCheck {
    email: String,
    code: String,
}

async fn verify_code(State(backend): State<Shared>, Json(body): Json<CodeCheck>) -> Response {
    let backend = backend.lock().await;
    if backend.reset_codes.get(&body.email.to_lowercase()) == Some(&body.code) {
        ack()
    } else {
        refuse(StatusCode::BAD_REQUEST, "The code is invalid or has expired")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewPassword {
    email: String,
    code: String,
    new_password: String,
}

async fn reset_password(State(backend): State<Shared>, Json(body): Json<NewPassword>) -> Response {
    let mut backend = backend.lock().await;
    let email = body.email.to_lowercase();
    if backend.reset_codes.get(&email) != Some(&body.code) {
        return refuse(StatusCode::BAD_REQUEST, "The code is invalid or has expired");
    }
    backend.reset_codes.remove(&email);
    if let Some(account) = backend.accounts.get_mut(&email) {
        account.password = body.new_password;
    }
    ack()
}

async fn fetch_profile(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock().await;
    backend
        .bearer_account(&headers)
        .map_or_else(unauthorized, |account| ok(account.profile_json()))
}

#[derive(Debug, Deserialize)]
struct ProfileChanges {
    name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

async fn update_profile(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ProfileChanges>,
) -> Response {
    let mut backend = backend.lock().await;
    let bare = backend.bare_profile_updates;
    let Some(account) = backend.bearer_account(&headers) else {
        return unauthorized();
    };

    if let Some(name) = body.name {
        account.name = Some(name);
    }
    if let Some(phone) = body.phone {
        account.phone = Some(phone);
    }
    if let Some(address) = body.address {
        account.address = Some(address);
    }

    if bare { ack() } else { ok(account.profile_json()) }
}
