//! Subcommand implementations.

pub mod account;
pub mod cart;
pub mod profile;
mod prompt;

use harbor_storefront::AppError;

/// Print the user-facing text of a failed command.
#[allow(clippy::print_stderr)]
pub fn print_failure(error: &AppError) {
    eprintln!("Error: {}", error.user_message());
}
