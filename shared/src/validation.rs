use crate::models::{RegisterRequest, UpdateUserRequest, UserChanges};

pub const MAX_OPTION_LENGTH: usize = 100;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please provide a vote option")]
    MissingOption,
    #[error("Option exceeds maximum length of {MAX_OPTION_LENGTH}")]
    OptionTooLong,
    #[error("Please provide a username")]
    MissingUsername,
    #[error("Username exceeds maximum length of {MAX_USERNAME_LENGTH}")]
    UsernameTooLong,
    #[error("Please provide a valid email")]
    InvalidEmail,
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,
    #[error("Please provide email and password")]
    MissingCredentials,
}

/// Trims the requested option name and rejects blank or oversized names.
pub fn validate_option(option: Option<&str>) -> Result<String, ValidationError> {
    let option = option.map(str::trim).unwrap_or_default();
    if option.is_empty() { return Err(ValidationError::MissingOption); }
    if option.chars().count() > MAX_OPTION_LENGTH { return Err(ValidationError::OptionTooLong); }
    Ok(option.to_string())
}

pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let username = username.trim();
    if username.is_empty() { return Err(ValidationError::MissingUsername); }
    if username.chars().count() > MAX_USERNAME_LENGTH { return Err(ValidationError::UsernameTooLong); }
    Ok(username.to_string())
}

pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LENGTH { return Err(ValidationError::InvalidEmail); }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(email),
        _ => Err(ValidationError::InvalidEmail),
    }
}

/// Returns the trimmed username and normalized email of a registration.
pub fn validate_registration(request: &RegisterRequest) -> Result<(String, String), ValidationError> {
    let username = validate_username(&request.username)?;
    let email = normalize_email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok((username, email))
}

pub fn validate_user_update(request: &UpdateUserRequest) -> Result<UserChanges, ValidationError> {
    Ok(UserChanges {
        username: request.username.as_deref().map(validate_username).transpose()?,
        email: request.email.as_deref().map(normalize_email).transpose()?,
        is_admin: request.is_admin,
    })
}
