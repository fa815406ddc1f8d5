use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Business-rule bounds ─────────────────────────────────────────

/// Nightly rate bounds, inclusive.
pub const MIN_ROOM_RATE: Decimal = dec!(50.00);
pub const MAX_ROOM_RATE: Decimal = dec!(500.00);

/// Booking total-price bounds, inclusive.
pub const MIN_TOTAL_PRICE: Decimal = dec!(50.00);
pub const MAX_TOTAL_PRICE: Decimal = dec!(500.00);

/// Payment amount: strictly positive, at most this.
pub const MAX_PAYMENT_AMOUNT: Decimal = dec!(10000.00);

/// Room capacity bounds, inclusive.
pub const MIN_ROOM_CAPACITY: u32 = 1;
pub const MAX_ROOM_CAPACITY: u32 = 5;

/// Longest bookable stay. 14 nights is legal, 15 is not.
pub const MAX_STAY_NIGHTS: i64 = 14;

/// Phone numbers, when supplied, are exactly this many digits.
pub const PHONE_NUMBER_LEN: usize = 10;

// ── Structural limits ────────────────────────────────────────────

pub const MAX_ROOM_NUMBER_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_ROOMS: usize = 10_000;
pub const MAX_GUESTS: usize = 100_000;
pub const MAX_BOOKINGS_PER_ROOM: usize = 10_000;
