use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Single,
    Double,
    Suite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Available,
    Booked,
    #[serde(rename = "Under Maintenance")]
    UnderMaintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking in this status occupies its date range for
    /// conflict purposes.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    PayPal,
}

/// Half-open stay `[check_in, check_out)` — the night of `check_out` is not
/// occupied, so a stay ending on a date and one starting on it do not clash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    /// Ordering is NOT asserted here; an inverted range is a rejection the
    /// availability engine reports, not a construction panic.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self { check_in, check_out }
    }

    /// Parse user-supplied date strings. Accepts ISO-8601 dates
    /// (`2025-03-01`) and datetimes (`2025-03-01T15:00`, truncated to the
    /// date). Absent or malformed input yields `None` — never a panic.
    pub fn parse(check_in: Option<&str>, check_out: Option<&str>) -> Option<Self> {
        let check_in = parse_date(check_in?)?;
        let check_out = parse_date(check_out?)?;
        Some(Self { check_in, check_out })
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(d) = raw.parse::<NaiveDate>() {
        return Some(d);
    }
    if let Ok(dt) = raw.parse::<NaiveDateTime>() {
        return Some(dt.date());
    }
    // datetime-local form without seconds, e.g. "2025-05-01T15:00"
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .ok()
        .map(|dt| dt.date())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub room_number: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub rate: Decimal,
    pub status: RoomStatus,
    pub capacity: u32,
    pub created_date: DateTime<Utc>,
    pub last_changed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub status: GuestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub room_id: i64,
    pub guest_id: i64,
    pub status: BookingStatus,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub payment_status: bool,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

/// A room plus its bookings, sorted by `check_in`. One of these sits behind
/// each per-room lock; the sort order keeps the conflict scan a window scan.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    pub bookings: Vec<Booking>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            bookings: Vec::new(),
        }
    }

    /// Insert a booking maintaining sort order by check_in.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.check_in, |b| b.check_in)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove_booking(&mut self, id: i64) -> Option<Booking> {
        if let Some(pos) = self.bookings.iter().position(|b| b.id == id) {
            Some(self.bookings.remove(pos))
        } else {
            None
        }
    }

    pub fn booking(&self, id: i64) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_mut(&mut self, id: i64) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Bookings whose stay overlaps the query range. Binary search skips
    /// everything starting at or after `query.check_out`.
    pub fn overlapping(&self, query: &StayRange) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.check_in < query.check_out);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.check_out > query.check_in)
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    RoomCreated {
        room: Room,
    },
    RoomUpdated {
        id: i64,
        room_type: RoomType,
        rate: Decimal,
        status: RoomStatus,
        capacity: u32,
        last_changed_date: DateTime<Utc>,
    },
    RoomDeleted {
        id: i64,
    },
    GuestCreated {
        guest: Guest,
    },
    GuestUpdated {
        guest: Guest,
    },
    GuestDeleted {
        id: i64,
    },
    BookingCreated {
        booking: Booking,
    },
    BookingTransitioned {
        id: i64,
        room_id: i64,
        status: BookingStatus,
    },
    PaymentRecorded {
        payment: Payment,
    },
}
