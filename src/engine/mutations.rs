use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tokio::sync::{oneshot, RwLock};

use crate::limits::*;
use crate::model::*;

use super::availability::evaluate_stay;
use super::validate::{validate_guest_fields, validate_room_fields};
use super::{Engine, EngineError, SharedRoomState, WalCommand};

/// Partial room update; `None` keeps the current value. The room number is
/// identity and cannot change after creation.
#[derive(Debug, Default, Clone)]
pub struct RoomPatch {
    pub room_type: Option<RoomType>,
    pub rate: Option<Decimal>,
    pub status: Option<RoomStatus>,
    pub capacity: Option<u32>,
}

/// Partial guest update; `None` keeps the current value.
#[derive(Debug, Default, Clone)]
pub struct GuestPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub status: Option<GuestStatus>,
}

impl Engine {
    // ── Rooms ────────────────────────────────────────────

    pub async fn create_room(
        &self,
        room_number: String,
        room_type: RoomType,
        rate: Decimal,
        status: RoomStatus,
        capacity: u32,
    ) -> Result<Room, EngineError> {
        if self.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        validate_room_fields(&room_number, rate, capacity)?;

        // Claim the number before touching the WAL so a racing create of
        // the same number loses here, not after it is durable.
        let id = self.alloc_room_id();
        match self.room_numbers.entry(room_number.clone()) {
            Entry::Occupied(_) => {
                return Err(EngineError::DuplicateRoomNumber(room_number));
            }
            Entry::Vacant(v) => {
                v.insert(id);
            }
        }

        let now = Utc::now();
        let room = Room {
            id,
            room_number: room_number.clone(),
            room_type,
            rate,
            status,
            capacity,
            created_date: now,
            last_changed_date: now,
        };
        let event = Event::RoomCreated { room: room.clone() };
        if let Err(e) = self.wal_append(&event).await {
            self.room_numbers.remove(&room_number);
            return Err(e);
        }
        self.rooms
            .insert(id, Arc::new(RwLock::new(RoomState::new(room.clone()))));
        Ok(room)
    }

    pub async fn update_room(&self, id: i64, patch: RoomPatch) -> Result<Room, EngineError> {
        let rs = self.room_state(id).ok_or(EngineError::RoomNotFound(id))?;
        let mut guard = rs.write().await;

        let room_type = patch.room_type.unwrap_or(guard.room.room_type);
        let rate = patch.rate.unwrap_or(guard.room.rate);
        let status = patch.status.unwrap_or(guard.room.status);
        let capacity = patch.capacity.unwrap_or(guard.room.capacity);
        validate_room_fields(&guard.room.room_number, rate, capacity)?;

        let event = Event::RoomUpdated {
            id,
            room_type,
            rate,
            status,
            capacity,
            last_changed_date: Utc::now(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(guard.room.clone())
    }

    /// Delete a room and everything hanging off it: its bookings and their
    /// payments. The write lock is held across the commit so no booking can
    /// slip in between the decision and the removal.
    pub async fn delete_room(&self, id: i64) -> Result<(), EngineError> {
        let rs = self.room_state(id).ok_or(EngineError::RoomNotFound(id))?;
        let guard = rs.write().await;
        let booking_ids: Vec<i64> = guard.bookings.iter().map(|b| b.id).collect();
        let room_number = guard.room.room_number.clone();

        self.wal_append(&Event::RoomDeleted { id }).await?;
        self.rooms.remove(&id);
        self.room_numbers.remove(&room_number);
        drop(guard);
        self.purge_bookings(&booking_ids);
        Ok(())
    }

    // ── Guests ───────────────────────────────────────────

    pub async fn create_guest(
        &self,
        first_name: String,
        last_name: String,
        email: String,
        phone_number: Option<String>,
        address: Option<String>,
    ) -> Result<Guest, EngineError> {
        if self.guests.len() >= MAX_GUESTS {
            return Err(EngineError::LimitExceeded("too many guests"));
        }
        validate_guest_fields(&first_name, &last_name, &email, phone_number.as_deref())?;

        let id = self.alloc_guest_id();
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(EngineError::FieldValidation {
                    field: "email",
                    reason: "Email already exists.".into(),
                });
            }
            Entry::Vacant(v) => {
                v.insert(id);
            }
        }

        let guest = Guest {
            id,
            first_name,
            last_name,
            email: email.clone(),
            phone_number,
            address,
            status: GuestStatus::Active,
        };
        let event = Event::GuestCreated {
            guest: guest.clone(),
        };
        if let Err(e) = self.wal_append(&event).await {
            self.emails.remove(&email);
            return Err(e);
        }
        self.guests.insert(id, guest.clone());
        Ok(guest)
    }

    pub async fn update_guest(&self, id: i64, patch: GuestPatch) -> Result<Guest, EngineError> {
        let current = self
            .guests
            .get(&id)
            .map(|g| g.clone())
            .ok_or(EngineError::GuestNotFound(id))?;

        let updated = Guest {
            id,
            first_name: patch.first_name.unwrap_or_else(|| current.first_name.clone()),
            last_name: patch.last_name.unwrap_or_else(|| current.last_name.clone()),
            email: patch.email.unwrap_or_else(|| current.email.clone()),
            phone_number: patch.phone_number.or_else(|| current.phone_number.clone()),
            address: patch.address.or_else(|| current.address.clone()),
            status: patch.status.unwrap_or(current.status),
        };
        validate_guest_fields(
            &updated.first_name,
            &updated.last_name,
            &updated.email,
            updated.phone_number.as_deref(),
        )?;

        let email_changed = updated.email != current.email;
        if email_changed {
            match self.emails.entry(updated.email.clone()) {
                Entry::Occupied(_) => {
                    return Err(EngineError::FieldValidation {
                        field: "email",
                        reason: "Email already exists.".into(),
                    });
                }
                Entry::Vacant(v) => {
                    v.insert(id);
                }
            }
        }

        let event = Event::GuestUpdated {
            guest: updated.clone(),
        };
        if let Err(e) = self.wal_append(&event).await {
            if email_changed {
                self.emails.remove(&updated.email);
            }
            return Err(e);
        }
        if email_changed {
            self.emails.remove(&current.email);
        }
        self.guests.insert(id, updated.clone());
        Ok(updated)
    }

    /// Delete a guest, cascading to their bookings and those bookings'
    /// payments across all rooms.
    pub async fn delete_guest(&self, id: i64) -> Result<(), EngineError> {
        if !self.guests.contains_key(&id) {
            return Err(EngineError::GuestNotFound(id));
        }
        self.wal_append(&Event::GuestDeleted { id }).await?;

        if let Some((_, guest)) = self.guests.remove(&id) {
            self.emails.remove(&guest.email);
        }
        let room_arcs: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut removed = Vec::new();
        for rs in room_arcs {
            let mut guard = rs.write().await;
            guard.bookings.retain(|b| {
                if b.guest_id == id {
                    removed.push(b.id);
                    false
                } else {
                    true
                }
            });
        }
        self.purge_bookings(&removed);
        Ok(())
    }

    // ── Bookings ─────────────────────────────────────────

    /// Create a booking. Field checks first, then the availability decision
    /// under the room's write lock — the lock is held until the event is
    /// durable, so the second of two racing overlapping requests sees the
    /// first one's booking and fails with `RoomUnavailable`.
    pub async fn create_booking(
        &self,
        room_id: i64,
        guest_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        total_price: Decimal,
    ) -> Result<Booking, EngineError> {
        let rs = self
            .room_state(room_id)
            .ok_or(EngineError::RoomNotFound(room_id))?;
        if !self.guests.contains_key(&guest_id) {
            return Err(EngineError::GuestNotFound(guest_id));
        }
        if total_price < MIN_TOTAL_PRICE || total_price > MAX_TOTAL_PRICE {
            return Err(EngineError::PriceOutOfBounds);
        }

        let mut guard = rs.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many bookings on room"));
        }

        let stay = StayRange::new(check_in, check_out);
        evaluate_stay(&guard, &stay, &self.policy, Utc::now().date_naive())?;

        let booking = Booking {
            id: self.alloc_booking_id(),
            room_id,
            guest_id,
            status: BookingStatus::Confirmed,
            check_in,
            check_out,
            payment_status: false,
            total_price,
            created_at: Utc::now(),
        };
        let event = Event::BookingCreated {
            booking: booking.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(booking)
    }

    /// Move a booking along its lifecycle. Legal edges:
    /// confirmed → checked_in → checked_out, and cancelled from either
    /// pre-checkout state. Everything else is `InvalidTransition`.
    pub async fn transition_booking(
        &self,
        id: i64,
        target: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let (room_id, mut guard) = self.resolve_booking_write(id).await?;
        let current = guard
            .booking(id)
            .ok_or(EngineError::BookingNotFound(id))?
            .status;

        let legal = matches!(
            (current, target),
            (BookingStatus::Confirmed, BookingStatus::CheckedIn)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::CheckedIn, BookingStatus::CheckedOut)
                | (BookingStatus::CheckedIn, BookingStatus::Cancelled)
        );
        if !legal {
            return Err(EngineError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let event = Event::BookingTransitioned {
            id,
            room_id,
            status: target,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        guard
            .booking(id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))
    }

    // ── Payments ─────────────────────────────────────────

    /// A missing booking reference is a structural fault, not a validation
    /// result — it surfaces as `MissingBookingRef` and maps to a 500.
    pub async fn record_payment(
        &self,
        booking_id: Option<i64>,
        amount: Decimal,
        method: PaymentMethod,
    ) -> Result<Payment, EngineError> {
        let booking_id = booking_id.ok_or(EngineError::MissingBookingRef)?;
        if amount <= Decimal::ZERO || amount > MAX_PAYMENT_AMOUNT {
            return Err(EngineError::AmountOutOfBounds);
        }

        let (_, mut guard) = self.resolve_booking_write(booking_id).await?;
        let payment = Payment {
            id: self.alloc_payment_id(),
            booking_id,
            amount,
            method,
        };
        let event = Event::PaymentRecorded {
            payment: payment.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(payment)
    }

    // ── WAL maintenance ──────────────────────────────────

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state: guests first (bookings reference them),
    /// then each room with its bookings, then payments.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        let mut guests: Vec<Guest> = self.guests.iter().map(|e| e.value().clone()).collect();
        guests.sort_by_key(|g| g.id);
        for guest in guests {
            events.push(Event::GuestCreated { guest });
        }

        let mut room_ids: Vec<i64> = self.rooms.iter().map(|e| *e.key()).collect();
        room_ids.sort();
        for id in room_ids {
            let Some(rs) = self.room_state(id) else {
                continue;
            };
            let guard = rs.read().await;
            events.push(Event::RoomCreated {
                room: guard.room.clone(),
            });
            for booking in &guard.bookings {
                events.push(Event::BookingCreated {
                    booking: booking.clone(),
                });
            }
        }

        let mut payments: Vec<Payment> = self.payments.iter().map(|e| e.value().clone()).collect();
        payments.sort_by_key(|p| p.id);
        for payment in payments {
            events.push(Event::PaymentRecorded { payment });
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
