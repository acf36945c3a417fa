//! Unified error handling with Sentry integration.
//!
//! Each module owns its error enum; [`AppError`] aggregates them for the
//! application root. [`AppError::user_message`] is the only text a
//! presentation layer should show, and [`AppError::report`] sends errors
//! that indicate a fault (rather than a user mistake) to Sentry.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::SubmitError;
use crate::cart::CatalogError;
use crate::config::ConfigError;
use crate::profile::ProfileError;
use crate::session::StorageError;

/// Generic message for failures the user can only retry.
pub const CONNECTION_PROBLEM: &str = "Connection problem, please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An auth flow submission failed.
    #[error("Auth error: {0}")]
    Auth(#[from] SubmitError),

    /// Profile load or save failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Product catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error indicates a fault worth reporting.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) | Self::Catalog(_) => true,
            Self::Api(e) => e.is_transport(),
            Self::Auth(e) => matches!(e, SubmitError::Transport(_)),
            Self::Profile(e) => matches!(e, ProfileError::Transport(_) | ProfileError::Directory(_)),
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Text safe to show to the user.
    ///
    /// Transport details and internal errors are never exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Api(ApiError::Unauthorized) => "Please log in again.".to_string(),
            Self::Api(_) => CONNECTION_PROBLEM.to_string(),
            Self::Storage(_) => "Could not save local data".to_string(),
            Self::Auth(e) => e.user_message(),
            Self::Profile(e) => e.user_message(),
            Self::Catalog(_) => "Product catalog unavailable".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Capture to Sentry when this is a fault, and log it.
    pub fn report(&self) {
        if self.is_fault() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "User-facing error");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
