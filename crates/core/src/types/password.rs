//! Password rules.
//!
//! Two policies exist: the lenient one applied at login (the account already
//! exists, so only a minimum length is checked) and the strong one applied
//! whenever a new password is chosen (signup and password reset).

/// Errors produced by [`PasswordPolicy::check`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The password is empty.
    #[error("password cannot be empty")]
    Empty,
    /// The password is shorter than the policy minimum.
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The password is longer than the policy maximum.
    #[error("password must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// No lowercase letter.
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    /// No uppercase letter.
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    /// No digit.
    #[error("password must contain a digit")]
    MissingDigit,
}

/// A set of password rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    pub min_len: usize,
    /// Maximum length in characters, if bounded.
    pub max_len: Option<usize>,
    /// Require at least one lowercase, one uppercase and one digit.
    pub require_mixed: bool,
}

impl PasswordPolicy {
    /// Policy for signing in with an existing password.
    pub const LOGIN: Self = Self {
        min_len: 6,
        max_len: None,
        require_mixed: false,
    };

    /// Policy for choosing a new password (signup, reset).
    pub const NEW_PASSWORD: Self = Self {
        min_len: 8,
        max_len: Some(16),
        require_mixed: true,
    };

    /// Check a candidate password against this policy.
    ///
    /// Lengths are counted in characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns the first rule the password violates.
    pub fn check(&self, password: &str) -> Result<(), PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Empty);
        }

        let len = password.chars().count();
        if len < self.min_len {
            return Err(PasswordError::TooShort { min: self.min_len });
        }
        if let Some(max) = self.max_len
            && len > max
        {
            return Err(PasswordError::TooLong { max });
        }

        if self.require_mixed {
            if !password.chars().any(|c| c.is_ascii_lowercase()) {
                return Err(PasswordError::MissingLowercase);
            }
            if !password.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(PasswordError::MissingUppercase);
            }
            if !password.chars().any(|c| c.is_ascii_digit()) {
                return Err(PasswordError::MissingDigit);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_policy() {
        assert_eq!(PasswordPolicy::LOGIN.check(""), Err(PasswordError::Empty));
        assert_eq!(
            PasswordPolicy::LOGIN.check("12345"),
            Err(PasswordError::TooShort { min: 6 })
        );
        assert!(PasswordPolicy::LOGIN.check("123456").is_ok());
        assert!(PasswordPolicy::LOGIN.check("a very long lowercase password").is_ok());
    }

    #[test]
    fn test_new_password_length_bounds() {
        let policy = PasswordPolicy::NEW_PASSWORD;
        assert_eq!(
            policy.check("Abc1234"),
            Err(PasswordError::TooShort { min: 8 })
        );
        assert!(policy.check("Abc12345").is_ok());
        assert!(policy.check("Abcdefgh12345678").is_ok());
        assert_eq!(
            policy.check("Abcdefgh123456789"),
            Err(PasswordError::TooLong { max: 16 })
        );
    }

    #[test]
    fn test_new_password_character_classes() {
        let policy = PasswordPolicy::NEW_PASSWORD;
        assert_eq!(
            policy.check("ABCD12345"),
            Err(PasswordError::MissingLowercase)
        );
        assert_eq!(
            policy.check("abcd12345"),
            Err(PasswordError::MissingUppercase)
        );
        assert_eq!(policy.check("Abcdefghi"), Err(PasswordError::MissingDigit));
    }

    #[test]
    fn test_length_counts_characters() {
        // 8 characters, more than 8 bytes
        assert!(PasswordPolicy::NEW_PASSWORD.check("Aé1ééééé").is_ok());
    }
}
