use crate::model::BookingStatus;

#[derive(Debug)]
pub enum EngineError {
    FieldValidation {
        field: &'static str,
        reason: String,
    },
    RoomNotFound(i64),
    GuestNotFound(i64),
    BookingNotFound(i64),
    DuplicateRoomNumber(String),
    InvalidDateInput,
    DateInPast,
    InvalidRange,
    DurationExceeded,
    RoomNotAvailable,
    RoomUnavailable,
    PriceOutOfBounds,
    AmountOutOfBounds,
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// A payment arrived without a booking reference. Structural fault, not
    /// a validation result — surfaces as a server error.
    MissingBookingRef,
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::FieldValidation { reason, .. } => write!(f, "{reason}"),
            EngineError::RoomNotFound(id) => write!(f, "Room {id} not found."),
            EngineError::GuestNotFound(id) => write!(f, "Guest {id} does not exist."),
            EngineError::BookingNotFound(id) => write!(f, "Booking {id} not found."),
            EngineError::DuplicateRoomNumber(n) => {
                write!(f, "Room number {n} already exists.")
            }
            EngineError::InvalidDateInput => write!(f, "Invalid date format."),
            EngineError::DateInPast => write!(f, "Check-in date cannot be in the past."),
            EngineError::InvalidRange => {
                write!(f, "Check-in date must be before check-out date.")
            }
            EngineError::DurationExceeded => {
                write!(f, "Booking cannot exceed 14 days.")
            }
            EngineError::RoomNotAvailable => {
                write!(f, "Room is not available for booking.")
            }
            EngineError::RoomUnavailable => {
                write!(f, "The room is already booked for the selected dates.")
            }
            EngineError::PriceOutOfBounds => {
                write!(f, "Total price must be between 50.00 and 500.00.")
            }
            EngineError::AmountOutOfBounds => {
                write!(f, "Amount must be greater than zero and cannot exceed 10000.")
            }
            EngineError::InvalidTransition { from, to } => {
                write!(
                    f,
                    "Cannot transition booking from {} to {}.",
                    from.as_str(),
                    to.as_str()
                )
            }
            EngineError::MissingBookingRef => {
                write!(f, "Booking cannot be empty or invalid.")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
