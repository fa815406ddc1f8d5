use chrono::NaiveDate;

use crate::limits::MAX_STAY_NIGHTS;
use crate::model::*;

use super::EngineError;

// ── Availability Decision ─────────────────────────────────────────

/// Which room statuses refuse new bookings.
///
/// `Available` is the only always-bookable status; by default both `Booked`
/// and `Under Maintenance` block. Operators who take bookings for rooms in
/// maintenance can shrink the set (see `maintenance_bookable`).
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub blocking_statuses: Vec<RoomStatus>,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            blocking_statuses: vec![RoomStatus::Booked, RoomStatus::UnderMaintenance],
        }
    }
}

impl BookingPolicy {
    pub fn new(maintenance_bookable: bool) -> Self {
        if maintenance_bookable {
            Self {
                blocking_statuses: vec![RoomStatus::Booked],
            }
        } else {
            Self::default()
        }
    }

    pub fn blocks(&self, status: RoomStatus) -> bool {
        self.blocking_statuses.contains(&status)
    }
}

/// Decide whether a candidate stay may be booked on this room.
///
/// Pure advisory function: reads the room's status and its bookings, mutates
/// nothing. The caller supplies `today`; the checks run in a fixed order so
/// the first failing one determines the reported reason:
///
/// 1. neither date may lie in the past
/// 2. `check_in` strictly before `check_out`
/// 3. stay no longer than `MAX_STAY_NIGHTS` nights (inclusive)
/// 4. the room's status must not be in the blocking set
/// 5. no active booking may overlap the half-open candidate range
pub fn evaluate_stay(
    rs: &RoomState,
    stay: &StayRange,
    policy: &BookingPolicy,
    today: NaiveDate,
) -> Result<(), EngineError> {
    if stay.check_in < today || stay.check_out < today {
        return Err(EngineError::DateInPast);
    }
    if stay.check_in >= stay.check_out {
        return Err(EngineError::InvalidRange);
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::DurationExceeded);
    }
    if policy.blocks(rs.room.status) {
        return Err(EngineError::RoomNotAvailable);
    }
    check_no_conflict(rs, stay)
}

/// Scan the room's bookings for an active one overlapping the candidate.
/// Half-open semantics: a booking ending exactly on `stay.check_in`, or
/// starting exactly on `stay.check_out`, is not a conflict.
pub fn check_no_conflict(rs: &RoomState, stay: &StayRange) -> Result<(), EngineError> {
    for booking in rs.overlapping(stay) {
        if booking.status.is_active() {
            return Err(EngineError::RoomUnavailable);
        }
    }
    Ok(())
}
