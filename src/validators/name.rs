use super::ValidationError;

pub const MAX_INVITE_MESSAGE_LENGTH: usize = 1000;

/// Validates a user or project name.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::NameEmpty);
    }

    if trimmed.chars().count() > 100 {
        return Err(ValidationError::NameTooLong);
    }

    Ok(())
}

pub fn validate_invite_message(message: &str) -> Result<(), ValidationError> {
    if message.chars().count() > MAX_INVITE_MESSAGE_LENGTH {
        return Err(ValidationError::MessageTooLong(MAX_INVITE_MESSAGE_LENGTH));
    }

    Ok(())
}
