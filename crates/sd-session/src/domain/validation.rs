//! Client-side form validation.
//!
//! Forms carry the confirmation field that never leaves the client. A form
//! validates into the request body that is actually sent.

use super::entities::{Credentials, ProfileUpdate, RegistrationRequest};
use super::errors::ValidationError;

/// Minimum password length accepted by the registration and profile forms.
pub const MIN_PASSWORD_LEN: usize = 6;

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Checks a login attempt has both fields filled in.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    required(&credentials.email, "Email")?;
    required(&credentials.password, "Password")
}

/// Registration form as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub city: String,
}

impl RegistrationForm {
    pub fn validate(self) -> Result<RegistrationRequest, ValidationError> {
        required(&self.full_name, "Full name")?;
        required(&self.email, "Email")?;
        required(&self.password, "Password")?;
        check_new_password(&self.password, &self.confirm_password)?;

        Ok(RegistrationRequest {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            city: non_empty(&self.city),
        })
    }
}

/// Profile edit form. A blank password keeps the current one.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub full_name: String,
    pub email: String,
    pub city: String,
    pub password: String,
    pub confirm_password: String,
}

impl ProfileForm {
    pub fn validate(self) -> Result<ProfileUpdate, ValidationError> {
        required(&self.full_name, "Full name")?;
        required(&self.email, "Email")?;

        let password = if self.password.is_empty() && self.confirm_password.is_empty() {
            None
        } else {
            check_new_password(&self.password, &self.confirm_password)?;
            Some(self.password)
        };

        Ok(ProfileUpdate {
            full_name: Some(self.full_name.trim().to_string()),
            email: Some(self.email.trim().to_string()),
            city: Some(self.city.trim().to_string()),
            password,
        })
    }
}
