use rust_decimal::Decimal;
use validator::ValidateEmail;

use crate::limits::*;

use super::EngineError;

fn field(field: &'static str, reason: &str) -> EngineError {
    EngineError::FieldValidation {
        field,
        reason: reason.to_string(),
    }
}

/// Room field rules. First violation wins.
pub(super) fn validate_room_fields(
    room_number: &str,
    rate: Decimal,
    capacity: u32,
) -> Result<(), EngineError> {
    if room_number.is_empty() {
        return Err(field("room_number", "Room number cannot be empty."));
    }
    if room_number.len() > MAX_ROOM_NUMBER_LEN {
        return Err(field("room_number", "Room number is too long."));
    }
    if !room_number.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(field("room_number", "Room number must be alphanumeric."));
    }
    if rate < MIN_ROOM_RATE || rate > MAX_ROOM_RATE {
        return Err(field("rate", "Rate must be between 50.00 and 500.00."));
    }
    if capacity < MIN_ROOM_CAPACITY {
        return Err(field("capacity", "Room capacity must be at least 1."));
    }
    if capacity > MAX_ROOM_CAPACITY {
        return Err(field("capacity", "Room capacity cannot exceed 5."));
    }
    Ok(())
}

/// Guest field rules. Email uniqueness is the engine's job — only format
/// checks happen here.
pub(super) fn validate_guest_fields(
    first_name: &str,
    last_name: &str,
    email: &str,
    phone_number: Option<&str>,
) -> Result<(), EngineError> {
    if first_name.is_empty() {
        return Err(field("first_name", "First name cannot be empty."));
    }
    if first_name.len() > MAX_NAME_LEN {
        return Err(field("first_name", "First name is too long."));
    }
    if last_name.is_empty() {
        return Err(field("last_name", "Last name cannot be empty."));
    }
    if last_name.len() > MAX_NAME_LEN {
        return Err(field("last_name", "Last name is too long."));
    }
    if email.is_empty() {
        return Err(field("email", "Email cannot be empty."));
    }
    if !email.validate_email() {
        return Err(field("email", "Invalid email format."));
    }
    if let Some(phone) = phone_number {
        if !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(field("phone_number", "Phone number must be numeric."));
        }
        if phone.len() != PHONE_NUMBER_LEN {
            return Err(field(
                "phone_number",
                "Phone number must be exactly 10 digits long.",
            ));
        }
    }
    Ok(())
}
