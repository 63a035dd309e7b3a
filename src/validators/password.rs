use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Password rules applied at signup.
///
/// ```
/// use gatehouse::validators::PasswordPolicy;
///
/// let policy = PasswordPolicy::default();
/// assert!(policy.validate("password123").is_ok());
///
/// let strict = PasswordPolicy::strict();
/// assert!(strict.validate("password").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Default: 8
    pub min_length: usize,
    /// Default: 128
    pub max_length: usize,
    pub require_letter: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_letter: false,
            require_digit: false,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            min_length: 12,
            max_length: 128,
            require_letter: true,
            require_digit: true,
        }
    }

    /// # Errors
    ///
    /// Returns the first rule the password breaks.
    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::PasswordEmpty);
        }

        let len = password.chars().count();
        if len < self.min_length {
            return Err(ValidationError::PasswordTooShort(self.min_length));
        }

        if len > self.max_length {
            return Err(ValidationError::PasswordTooLong(self.max_length));
        }

        if self.require_letter && !password.chars().any(char::is_alphabetic) {
            return Err(ValidationError::PasswordMissingLetter);
        }

        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::PasswordMissingDigit);
        }

        Ok(())
    }
}

/// Validates a password against the default policy.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    PasswordPolicy::default().validate(password)
}
