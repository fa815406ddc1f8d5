use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total engine operations executed. Labels: operation, status.
pub const OPERATIONS_TOTAL: &str = "innkeep_operations_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const OPERATION_DURATION_SECONDS: &str = "innkeep_operation_duration_seconds";

/// Counter: booking attempts turned away. Labels: reason.
pub const BOOKINGS_REJECTED_TOTAL: &str = "innkeep_bookings_rejected_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: rooms currently registered.
pub const ROOMS_ACTIVE: &str = "innkeep_rooms_active";

/// Gauge: guests currently registered.
pub const GUESTS_ACTIVE: &str = "innkeep_guests_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "innkeep_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "innkeep_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Record one engine operation: outcome counter plus latency histogram.
pub fn record_operation(operation: &'static str, ok: bool, started: Instant) {
    let status = if ok { "ok" } else { "rejected" };
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => status)
        .increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

/// Map a rejection to a short label for metrics.
pub fn rejection_label(err: &EngineError) -> &'static str {
    match err {
        EngineError::FieldValidation { .. } => "field_validation",
        EngineError::RoomNotFound(_) => "room_not_found",
        EngineError::GuestNotFound(_) => "guest_not_found",
        EngineError::BookingNotFound(_) => "booking_not_found",
        EngineError::DuplicateRoomNumber(_) => "duplicate_room_number",
        EngineError::InvalidDateInput => "invalid_date_input",
        EngineError::DateInPast => "date_in_past",
        EngineError::InvalidRange => "invalid_range",
        EngineError::DurationExceeded => "duration_exceeded",
        EngineError::RoomNotAvailable => "room_not_available",
        EngineError::RoomUnavailable => "room_unavailable",
        EngineError::PriceOutOfBounds => "price_out_of_bounds",
        EngineError::AmountOutOfBounds => "amount_out_of_bounds",
        EngineError::InvalidTransition { .. } => "invalid_transition",
        EngineError::MissingBookingRef => "missing_booking_ref",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        EngineError::WalError(_) => "wal_error",
    }
}
