use std::sync::Arc;
use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineError, GuestPatch, RoomPatch};
use crate::model::*;
use crate::observability;

type Eng = web::Data<Arc<Engine>>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

/// Map an engine rejection onto the wire: 404 for unresolved ids, 500 for
/// structural/durability faults, 400 for everything recoverable.
fn reject(err: EngineError) -> HttpResponse {
    let status = match &err {
        EngineError::RoomNotFound(_)
        | EngineError::GuestNotFound(_)
        | EngineError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::MissingBookingRef | EngineError::WalError(_) => {
            tracing::error!("structural fault: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    let field = match &err {
        EngineError::FieldValidation { field, .. } => Some(*field),
        _ => None,
    };
    HttpResponse::build(status).json(ErrorResponse {
        error: err.to_string(),
        field,
    })
}

fn count_rejection(err: &EngineError) {
    metrics::counter!(
        observability::BOOKINGS_REJECTED_TOTAL,
        "reason" => observability::rejection_label(err)
    )
    .increment(1);
}

// ── Rooms ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    room_number: String,
    #[serde(rename = "type")]
    room_type: RoomType,
    rate: Decimal,
    status: RoomStatus,
    capacity: u32,
}

#[derive(Debug, Deserialize)]
struct UpdateRoomRequest {
    #[serde(rename = "type")]
    room_type: RoomType,
    rate: Decimal,
    status: RoomStatus,
    capacity: u32,
}

#[derive(Debug, Deserialize)]
struct PatchRoomRequest {
    #[serde(rename = "type")]
    room_type: Option<RoomType>,
    rate: Option<Decimal>,
    status: Option<RoomStatus>,
    capacity: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    check_in: Option<String>,
    check_out: Option<String>,
}

async fn list_rooms(engine: Eng) -> impl Responder {
    HttpResponse::Ok().json(engine.list_rooms().await)
}

async fn create_room(engine: Eng, body: web::Json<CreateRoomRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let result = engine
        .create_room(b.room_number, b.room_type, b.rate, b.status, b.capacity)
        .await;
    observability::record_operation("create_room", result.is_ok(), started);
    match result {
        Ok(room) => {
            metrics::gauge!(observability::ROOMS_ACTIVE).set(engine.room_count() as f64);
            HttpResponse::Created().json(room)
        }
        Err(e) => reject(e),
    }
}

async fn get_room(engine: Eng, path: web::Path<i64>) -> impl Responder {
    match engine.get_room(path.into_inner()).await {
        Ok(room) => HttpResponse::Ok().json(room),
        Err(e) => reject(e),
    }
}

async fn put_room(engine: Eng, path: web::Path<i64>, body: web::Json<UpdateRoomRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let patch = RoomPatch {
        room_type: Some(b.room_type),
        rate: Some(b.rate),
        status: Some(b.status),
        capacity: Some(b.capacity),
    };
    let result = engine.update_room(path.into_inner(), patch).await;
    observability::record_operation("update_room", result.is_ok(), started);
    match result {
        Ok(room) => HttpResponse::Ok().json(room),
        Err(e) => reject(e),
    }
}

async fn patch_room(engine: Eng, path: web::Path<i64>, body: web::Json<PatchRoomRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let patch = RoomPatch {
        room_type: b.room_type,
        rate: b.rate,
        status: b.status,
        capacity: b.capacity,
    };
    let result = engine.update_room(path.into_inner(), patch).await;
    observability::record_operation("update_room", result.is_ok(), started);
    match result {
        Ok(room) => HttpResponse::Ok().json(room),
        Err(e) => reject(e),
    }
}

async fn delete_room(engine: Eng, path: web::Path<i64>) -> impl Responder {
    let started = Instant::now();
    let result = engine.delete_room(path.into_inner()).await;
    observability::record_operation("delete_room", result.is_ok(), started);
    match result {
        Ok(()) => {
            metrics::gauge!(observability::ROOMS_ACTIVE).set(engine.room_count() as f64);
            HttpResponse::NoContent().finish()
        }
        Err(e) => reject(e),
    }
}

async fn room_availability(
    engine: Eng,
    path: web::Path<i64>,
    query: web::Query<AvailabilityQuery>,
) -> impl Responder {
    let started = Instant::now();
    let result = engine
        .check_availability(
            path.into_inner(),
            query.check_in.as_deref(),
            query.check_out.as_deref(),
        )
        .await;
    observability::record_operation("check_availability", result.is_ok(), started);
    match result {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"message": "Room is available!"})),
        Err(e) => {
            count_rejection(&e);
            reject(e)
        }
    }
}

// ── Guests ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateGuestRequest {
    first_name: String,
    last_name: String,
    email: String,
    phone_number: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PatchGuestRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    status: Option<GuestStatus>,
}

async fn list_guests(engine: Eng) -> impl Responder {
    HttpResponse::Ok().json(engine.list_guests())
}

async fn create_guest(engine: Eng, body: web::Json<CreateGuestRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let result = engine
        .create_guest(b.first_name, b.last_name, b.email, b.phone_number, b.address)
        .await;
    observability::record_operation("create_guest", result.is_ok(), started);
    match result {
        Ok(guest) => {
            metrics::gauge!(observability::GUESTS_ACTIVE).set(engine.guest_count() as f64);
            HttpResponse::Created().json(guest)
        }
        Err(e) => reject(e),
    }
}

async fn get_guest(engine: Eng, path: web::Path<i64>) -> impl Responder {
    match engine.get_guest(path.into_inner()) {
        Ok(guest) => HttpResponse::Ok().json(guest),
        Err(e) => reject(e),
    }
}

async fn patch_guest(engine: Eng, path: web::Path<i64>, body: web::Json<PatchGuestRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let patch = GuestPatch {
        first_name: b.first_name,
        last_name: b.last_name,
        email: b.email,
        phone_number: b.phone_number,
        address: b.address,
        status: b.status,
    };
    let result = engine.update_guest(path.into_inner(), patch).await;
    observability::record_operation("update_guest", result.is_ok(), started);
    match result {
        Ok(guest) => HttpResponse::Ok().json(guest),
        Err(e) => reject(e),
    }
}

async fn delete_guest(engine: Eng, path: web::Path<i64>) -> impl Responder {
    let started = Instant::now();
    let result = engine.delete_guest(path.into_inner()).await;
    observability::record_operation("delete_guest", result.is_ok(), started);
    match result {
        Ok(()) => {
            metrics::gauge!(observability::GUESTS_ACTIVE).set(engine.guest_count() as f64);
            HttpResponse::NoContent().finish()
        }
        Err(e) => reject(e),
    }
}

// ── Bookings ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    room_id: i64,
    guest_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    total_price: Decimal,
}

async fn list_bookings(engine: Eng) -> impl Responder {
    HttpResponse::Ok().json(engine.list_bookings().await)
}

async fn create_booking(engine: Eng, body: web::Json<CreateBookingRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let result = engine
        .create_booking(b.room_id, b.guest_id, b.check_in, b.check_out, b.total_price)
        .await;
    observability::record_operation("create_booking", result.is_ok(), started);
    match result {
        Ok(booking) => HttpResponse::Created().json(booking),
        Err(e) => {
            count_rejection(&e);
            reject(e)
        }
    }
}

async fn get_booking(engine: Eng, path: web::Path<i64>) -> impl Responder {
    match engine.get_booking(path.into_inner()).await {
        Ok(booking) => HttpResponse::Ok().json(booking),
        Err(e) => reject(e),
    }
}

async fn transition(engine: &Engine, id: i64, target: BookingStatus) -> HttpResponse {
    let started = Instant::now();
    let result = engine.transition_booking(id, target).await;
    observability::record_operation("transition_booking", result.is_ok(), started);
    match result {
        Ok(booking) => HttpResponse::Ok().json(booking),
        Err(e) => reject(e),
    }
}

async fn check_in_booking(engine: Eng, path: web::Path<i64>) -> impl Responder {
    transition(&engine, path.into_inner(), BookingStatus::CheckedIn).await
}

async fn check_out_booking(engine: Eng, path: web::Path<i64>) -> impl Responder {
    transition(&engine, path.into_inner(), BookingStatus::CheckedOut).await
}

async fn cancel_booking(engine: Eng, path: web::Path<i64>) -> impl Responder {
    transition(&engine, path.into_inner(), BookingStatus::Cancelled).await
}

// ── Payments ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreatePaymentRequest {
    booking_id: Option<i64>,
    amount: Decimal,
    method: PaymentMethod,
}

async fn list_payments(engine: Eng) -> impl Responder {
    HttpResponse::Ok().json(engine.list_payments())
}

async fn create_payment(engine: Eng, body: web::Json<CreatePaymentRequest>) -> impl Responder {
    let started = Instant::now();
    let b = body.into_inner();
    let result = engine.record_payment(b.booking_id, b.amount, b.method).await;
    observability::record_operation("record_payment", result.is_ok(), started);
    match result {
        Ok(payment) => HttpResponse::Created().json(payment),
        Err(e) => reject(e),
    }
}

// ── Routing ──────────────────────────────────────────────

/// Route table, shared by the server binary and the integration tests.
/// Mount behind `NormalizePath::trim()` so the reference URLs with trailing
/// slashes (`/rooms/`, `/rooms/{id}/availability/`) resolve too.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rooms")
            .route("", web::get().to(list_rooms))
            .route("", web::post().to(create_room))
            .route("/{id}", web::get().to(get_room))
            .route("/{id}", web::put().to(put_room))
            .route("/{id}", web::patch().to(patch_room))
            .route("/{id}", web::delete().to(delete_room))
            .route("/{id}/availability", web::get().to(room_availability)),
    )
    .service(
        web::scope("/guests")
            .route("", web::get().to(list_guests))
            .route("", web::post().to(create_guest))
            .route("/{id}", web::get().to(get_guest))
            .route("/{id}", web::patch().to(patch_guest))
            .route("/{id}", web::delete().to(delete_guest)),
    )
    .service(
        web::scope("/bookings")
            .route("", web::get().to(list_bookings))
            .route("", web::post().to(create_booking))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/check-in", web::post().to(check_in_booking))
            .route("/{id}/check-out", web::post().to(check_out_booking))
            .route("/{id}/cancel", web::post().to(cancel_booking)),
    )
    .service(
        web::scope("/payments")
            .route("", web::get().to(list_payments))
            .route("", web::post().to(create_payment)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_status_mapping() {
        assert_eq!(reject(EngineError::RoomNotFound(1)).status(), StatusCode::NOT_FOUND);
        assert_eq!(reject(EngineError::GuestNotFound(1)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            reject(EngineError::BookingNotFound(1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            reject(EngineError::RoomUnavailable).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            reject(EngineError::InvalidDateInput).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            reject(EngineError::MissingBookingRef).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            reject(EngineError::WalError("disk full".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
