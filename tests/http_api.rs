use std::path::PathBuf;
use std::sync::Arc;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{middleware, test, web, App};
use chrono::{Days, Utc};
use serde_json::{json, Value};

use innkeep::engine::{BookingPolicy, Engine};
use innkeep::http;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("innkeep_test_http");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

/// Date `offset` days from today, as the wire string.
fn day(offset: u64) -> String {
    (Utc::now().date_naive() + Days::new(offset)).to_string()
}

async fn spawn_app(
    name: &str,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let engine = web::Data::new(Arc::new(
        Engine::new(test_wal_path(name), BookingPolicy::default()).unwrap(),
    ));
    test::init_service(
        App::new()
            .app_data(engine)
            .wrap(middleware::NormalizePath::trim())
            .configure(http::configure),
    )
    .await
}

async fn create_room(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    number: &str,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/rooms/")
        .set_json(json!({
            "room_number": number,
            "type": "Suite",
            "rate": "100.00",
            "status": "Available",
            "capacity": 3
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    test::read_body_json(resp).await
}

async fn create_guest(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    email: &str,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/guests/")
        .set_json(json!({
            "first_name": "John",
            "last_name": "Doe",
            "email": email,
            "phone_number": "1234567890"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    test::read_body_json(resp).await
}

async fn create_booking(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    room_id: i64,
    guest_id: i64,
    check_in: String,
    check_out: String,
) -> ServiceResponse {
    let req = test::TestRequest::post()
        .uri("/bookings/")
        .set_json(json!({
            "room_id": room_id,
            "guest_id": guest_id,
            "check_in": check_in,
            "check_out": check_out,
            "total_price": "100.00"
        }))
        .to_request();
    test::call_service(app, req).await
}

#[actix_web::test]
async fn room_crud_round_trip() {
    let app = spawn_app("room_crud.wal").await;

    let created = create_room(&app, "103C").await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["room_number"], "103C");
    assert_eq!(created["type"], "Suite");
    assert_eq!(created["status"], "Available");
    assert_eq!(created["capacity"], 3);
    assert!(created["created_date"].is_string());

    // list contains it
    let resp = test::call_service(&app, test::TestRequest::get().uri("/rooms/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rooms: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["id"], id);

    // fetch by id returns identical fields
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/rooms/{id}")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = test::read_body_json(resp).await;
    assert_eq!(fetched, created);

    // PATCH a single field
    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/rooms/{id}"))
            .set_json(json!({"status": "Under Maintenance"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Value = test::read_body_json(resp).await;
    assert_eq!(patched["status"], "Under Maintenance");
    assert_eq!(patched["rate"], "100.00");

    // PUT a full update
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/rooms/{id}"))
            .set_json(json!({
                "type": "Double",
                "rate": "200.00",
                "status": "Available",
                "capacity": 2
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["type"], "Double");
    assert_eq!(updated["rate"], "200.00");

    // DELETE then 404
    let resp = test::call_service(
        &app,
        test::TestRequest::delete().uri(&format!("/rooms/{id}")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/rooms/{id}")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn room_field_errors_are_structured() {
    let app = spawn_app("room_field_errors.wal").await;
    let req = test::TestRequest::post()
        .uri("/rooms/")
        .set_json(json!({
            "room_number": "501A",
            "type": "Single",
            "rate": "80.00",
            "status": "Available",
            "capacity": 6
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "capacity");
    assert_eq!(body["error"], "Room capacity cannot exceed 5.");

    // update of a missing room is a 404
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri("/rooms/42")
            .set_json(json!({
                "type": "Single",
                "rate": "80.00",
                "status": "Available",
                "capacity": 1
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn availability_endpoint_shapes() {
    let app = spawn_app("availability_shapes.wal").await;
    let room = create_room(&app, "103C").await;
    let id = room["id"].as_i64().unwrap();

    // free range → the exact success message
    let uri = format!(
        "/rooms/{id}/availability/?check_in={}&check_out={}",
        day(5),
        day(10)
    );
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Room is available!");

    // missing parameter → 400
    let uri = format!("/rooms/{id}/availability/?check_in={}", day(5));
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid date format.");

    // malformed parameter → 400
    let uri = format!(
        "/rooms/{id}/availability/?check_in=whenever&check_out={}",
        day(10)
    );
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // unknown room → 404
    let uri = format!(
        "/rooms/999/availability/?check_in={}&check_out={}",
        day(5),
        day(10)
    );
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn booking_conflicts_over_http() {
    let app = spawn_app("booking_conflicts.wal").await;
    let room = create_room(&app, "103C").await;
    let guest = create_guest(&app, "john.doe@example.com").await;
    let room_id = room["id"].as_i64().unwrap();
    let guest_id = guest["id"].as_i64().unwrap();

    // first booking wins
    let resp = create_booking(&app, room_id, guest_id, day(10), day(15)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let booking: Value = test::read_body_json(resp).await;
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["payment_status"], false);

    // overlapping booking is turned away with the canonical reason
    let resp = create_booking(&app, room_id, guest_id, day(8), day(12)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "The room is already booked for the selected dates.");

    // the availability endpoint agrees
    let uri = format!(
        "/rooms/{room_id}/availability/?check_in={}&check_out={}",
        day(8),
        day(12)
    );
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // an adjacent stay is fine
    let resp = create_booking(&app, room_id, guest_id, day(15), day(20)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn booking_lifecycle_over_http() {
    let app = spawn_app("booking_lifecycle.wal").await;
    let room = create_room(&app, "104A").await;
    let guest = create_guest(&app, "jane@example.com").await;
    let room_id = room["id"].as_i64().unwrap();
    let guest_id = guest["id"].as_i64().unwrap();

    let resp = create_booking(&app, room_id, guest_id, day(5), day(10)).await;
    let booking: Value = test::read_body_json(resp).await;
    let booking_id = booking["id"].as_i64().unwrap();

    // check in — the room flips to Booked
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/bookings/{booking_id}/check-in"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let checked_in: Value = test::read_body_json(resp).await;
    assert_eq!(checked_in["status"], "checked_in");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/rooms/{room_id}")).to_request(),
    )
    .await;
    let room_now: Value = test::read_body_json(resp).await;
    assert_eq!(room_now["status"], "Booked");

    // paying marks the booking
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/payments/")
            .set_json(json!({
                "booking_id": booking_id,
                "amount": "100.00",
                "method": "Credit Card"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/bookings/{booking_id}"))
            .to_request(),
    )
    .await;
    let paid: Value = test::read_body_json(resp).await;
    assert_eq!(paid["payment_status"], true);

    // check out — room released, booking terminal
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/bookings/{booking_id}/check-out"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/bookings/{booking_id}/cancel"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_without_booking_ref_is_a_server_error() {
    let app = spawn_app("payment_no_ref.wal").await;
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/payments/")
            .set_json(json!({
                "amount": "100.00",
                "method": "PayPal"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn guest_uniqueness_over_http() {
    let app = spawn_app("guest_unique.wal").await;
    create_guest(&app, "dup@example.com").await;

    let req = test::TestRequest::post()
        .uri("/guests/")
        .set_json(json!({
            "first_name": "Second",
            "last_name": "Guest",
            "email": "dup@example.com"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "email");
    assert_eq!(body["error"], "Email already exists.");
}
