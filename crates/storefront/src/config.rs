//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HARBOR_API_BASE_URL` - Origin of the storefront backend (e.g., `https://shop.example.com`)
//!
//! ## Optional
//! - `HARBOR_STATE_DIR` - Directory for durable client state (default: `.harbor`)
//! - `HARBOR_SHIPPING_FEE` - Flat shipping fee added to every cart (default: 60)
//! - `HARBOR_CURRENCY` - ISO 4217 currency code for cart pricing (default: TWD)
//! - `HARBOR_REQUEST_TIMEOUT_SECS` - HTTP request timeout; unset means the client default
//! - `HARBOR_RESET_COMPLETION` - `login` (default) or `done`; where a finished password reset lands
//! - `HARBOR_CATALOG` - JSON product catalog used when adding to the cart
//! - `HARBOR_ADDRESS_DIRECTORY` - JSON city/district directory used to parse profile addresses
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use harbor_core::CurrencyCode;

use crate::auth::ResetCompletion;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend origin; endpoint paths are joined onto it
    pub api_base_url: Url,
    /// Directory holding the durable session and cart records
    pub state_dir: PathBuf,
    /// Cart pricing configuration
    pub cart: CartConfig,
    /// Per-request HTTP timeout, if any
    pub request_timeout: Option<Duration>,
    /// Where a completed password reset lands
    pub reset_completion: ResetCompletion,
    /// Product catalog file
    pub catalog_path: Option<PathBuf>,
    /// City/district directory file
    pub address_directory_path: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Cart pricing configuration.
#[derive(Debug, Clone, Copy)]
pub struct CartConfig {
    /// Flat shipping fee
    pub shipping_fee: Decimal,
    /// Currency every cart amount is expressed in
    pub currency: CurrencyCode,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            shipping_fee: Decimal::from(60),
            currency: CurrencyCode::TWD,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_required_env("HARBOR_API_BASE_URL")?)?;
        let state_dir = PathBuf::from(get_env_or_default("HARBOR_STATE_DIR", ".harbor"));
        let cart = CartConfig::from_env()?;

        let request_timeout = get_optional_env("HARBOR_REQUEST_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "HARBOR_REQUEST_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?;

        let reset_completion = get_env_or_default("HARBOR_RESET_COMPLETION", "login")
            .parse::<ResetCompletion>()
            .map_err(|e| ConfigError::InvalidEnvVar("HARBOR_RESET_COMPLETION".to_string(), e))?;

        Ok(Self {
            api_base_url,
            state_dir,
            cart,
            request_timeout,
            reset_completion,
            catalog_path: get_optional_env("HARBOR_CATALOG").map(PathBuf::from),
            address_directory_path: get_optional_env("HARBOR_ADDRESS_DIRECTORY").map(PathBuf::from),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_base_url` with every optional value defaulted.
    #[must_use]
    pub fn new(api_base_url: Url, state_dir: PathBuf) -> Self {
        Self {
            api_base_url,
            state_dir,
            cart: CartConfig::default(),
            request_timeout: None,
            reset_completion: ResetCompletion::default(),
            catalog_path: None,
            address_directory_path: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let shipping_fee = get_env_or_default("HARBOR_SHIPPING_FEE", "60")
            .parse::<Decimal>()
            .map_err(|e| ConfigError::InvalidEnvVar("HARBOR_SHIPPING_FEE".to_string(), e.to_string()))?;
        if shipping_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "HARBOR_SHIPPING_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let currency = get_env_or_default("HARBOR_CURRENCY", "TWD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("HARBOR_CURRENCY".to_string(), e))?;

        Ok(Self {
            shipping_fee,
            currency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the backend origin, requiring an http(s) scheme.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("HARBOR_API_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "HARBOR_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
