//! Profile of the logged-in user.

pub mod address;
mod service;

pub use address::{
    AddressDirectory, AddressDirectorySource, City, DirectoryError, District, JsonFileDirectory,
    PostalAddress, StaticDirectory,
};
pub use service::{Profile, ProfileEdit, ProfileService};

use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;
use crate::error::CONNECTION_PROBLEM;

#[derive(Debug, Error)]
pub enum ProfileError {
    /// No session to authenticate with.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The backend rejected the token; the session has been cleared.
    #[error("Session expired")]
    Unauthorized,

    /// The backend answered `status: false`.
    #[error("{message}")]
    Functional { message: String },

    #[error("Transport failure: {0}")]
    Transport(#[source] ApiError),

    /// The address directory could not be loaded.
    #[error("Address directory unavailable: {0}")]
    Directory(Arc<DirectoryError>),
}

impl ProfileError {
    /// Text safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Please log in first.".to_string(),
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::Functional { message } => message.clone(),
            Self::Transport(_) | Self::Directory(_) => CONNECTION_PROBLEM.to_string(),
        }
    }
}
