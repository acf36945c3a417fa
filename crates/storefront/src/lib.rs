//! Harbor storefront core.
//!
//! The stateful parts of the storefront client, independent of any
//! rendering layer:
//!
//! - [`cart`] - cart contents, selection and pricing
//! - [`session`] - the durable logged-in session
//! - [`auth`] - the login / signup / password-reset flow
//! - [`profile`] - profile loading and saving
//! - [`api`] - the backend HTTP client
//! - [`state`] - the application root wiring these together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod profile;
pub mod session;
pub mod state;

pub use error::{AppError, Result};
pub use state::AppState;
