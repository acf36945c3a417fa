//! Core types for Harbor.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod id;
pub mod password;
pub mod price;

pub use credential::{BearerToken, CodeError, VerificationCode};
pub use email::{Email, EmailError};
pub use id::*;
pub use password::{PasswordError, PasswordPolicy};
pub use price::{CurrencyCode, Price};
