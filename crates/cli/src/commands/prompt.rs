//! Line-oriented prompts on stdin.

use std::io::{self, BufRead, Write};

use secrecy::SecretString;

use harbor_storefront::AppError;

/// Ask for one line of input, trimmed of the trailing newline.
#[allow(clippy::print_stderr)]
pub fn line(label: &str) -> Result<String, AppError> {
    eprint!("{label}: ");
    io::stderr().flush().map_err(input_error)?;

    let mut buf = String::new();
    let read = io::stdin().lock().read_line(&mut buf).map_err(input_error)?;
    if read == 0 {
        return Err(AppError::BadRequest(format!("No value given for {label}")));
    }
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask for a password. The value is held as a secret from the moment it is read.
pub fn secret(label: &str) -> Result<SecretString, AppError> {
    line(label).map(SecretString::from)
}

/// Use `given`, or ask for it when absent.
pub fn or_ask(given: Option<String>, label: &str) -> Result<String, AppError> {
    given.map_or_else(|| line(label), Ok)
}

fn input_error(e: io::Error) -> AppError {
    AppError::BadRequest(format!("Could not read input: {e}"))
}
