//! Request and response bodies of the auth endpoints.

use serde::{Deserialize, Serialize};

use crate::{ValidationError, user::User};

/// The shortest password the backend accepts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// The email and password sent to log in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    /// The email address the account was registered with.
    pub email: String,
    /// The account password.
    pub password: String,
}

/// The body of a successful log in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    /// The access token.
    pub access: String,
    /// The refresh token.
    pub refresh: String,
    /// The profile of the user that logged in.
    pub user: User,
}

/// The fields of the registration form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationForm {
    /// The display name for the new account.
    pub username: String,
    /// The email address to log in with.
    pub email: String,
    /// The new password.
    pub password: String,
    /// The new password, typed again.
    pub password_confirmation: String,
}

impl RegistrationForm {
    /// Check the form before it is sent.
    ///
    /// # Errors
    ///
    /// - [ValidationError::EmptyField] if the username or email is blank,
    /// - [ValidationError::PasswordMismatch] if the two passwords differ,
    /// - [ValidationError::PasswordTooShort] if the password has fewer than
    ///   [MIN_PASSWORD_LENGTH] characters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyField("username"));
        }

        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email"));
        }

        if self.password != self.password_confirmation {
            return Err(ValidationError::PasswordMismatch);
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }

        Ok(())
    }
}
