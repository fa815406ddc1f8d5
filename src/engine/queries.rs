use chrono::Utc;

use crate::model::*;

use super::availability::evaluate_stay;
use super::{Engine, EngineError, SharedRoomState};

impl Engine {
    pub async fn list_rooms(&self) -> Vec<Room> {
        let arcs: Vec<SharedRoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rooms = Vec::with_capacity(arcs.len());
        for rs in arcs {
            rooms.push(rs.read().await.room.clone());
        }
        rooms.sort_by_key(|r| r.id);
        rooms
    }

    pub async fn get_room(&self, id: i64) -> Result<Room, EngineError> {
        let rs = self.room_state(id).ok_or(EngineError::RoomNotFound(id))?;
        let guard = rs.read().await;
        Ok(guard.room.clone())
    }

    pub async fn list_bookings(&self) -> Vec<Booking> {
        let arcs: Vec<SharedRoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut bookings = Vec::new();
        for rs in arcs {
            let guard = rs.read().await;
            bookings.extend(guard.bookings.iter().cloned());
        }
        bookings.sort_by_key(|b| b.id);
        bookings
    }

    pub async fn get_booking(&self, id: i64) -> Result<Booking, EngineError> {
        let room_id = self
            .room_for_booking(id)
            .ok_or(EngineError::BookingNotFound(id))?;
        let rs = self
            .room_state(room_id)
            .ok_or(EngineError::BookingNotFound(id))?;
        let guard = rs.read().await;
        guard
            .booking(id)
            .cloned()
            .ok_or(EngineError::BookingNotFound(id))
    }

    /// Bookings for one room, in check_in order.
    pub async fn bookings_for_room(&self, room_id: i64) -> Result<Vec<Booking>, EngineError> {
        let rs = self
            .room_state(room_id)
            .ok_or(EngineError::RoomNotFound(room_id))?;
        let guard = rs.read().await;
        Ok(guard.bookings.clone())
    }

    pub fn list_guests(&self) -> Vec<Guest> {
        let mut guests: Vec<Guest> = self.guests.iter().map(|e| e.value().clone()).collect();
        guests.sort_by_key(|g| g.id);
        guests
    }

    pub fn get_guest(&self, id: i64) -> Result<Guest, EngineError> {
        self.guests
            .get(&id)
            .map(|g| g.clone())
            .ok_or(EngineError::GuestNotFound(id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn guest_count(&self) -> usize {
        self.guests.len()
    }

    pub fn list_payments(&self) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self.payments.iter().map(|e| e.value().clone()).collect();
        payments.sort_by_key(|p| p.id);
        payments
    }

    /// The availability question as the HTTP surface asks it: raw query
    /// strings in, a yes/no decision out. Absent or malformed dates are a
    /// returned `InvalidDateInput`, never a panic — only an unknown room is
    /// a lookup failure.
    pub async fn check_availability(
        &self,
        room_id: i64,
        check_in: Option<&str>,
        check_out: Option<&str>,
    ) -> Result<(), EngineError> {
        let rs = self
            .room_state(room_id)
            .ok_or(EngineError::RoomNotFound(room_id))?;
        let stay = StayRange::parse(check_in, check_out).ok_or(EngineError::InvalidDateInput)?;
        let guard = rs.read().await;
        evaluate_stay(&guard, &stay, &self.policy, Utc::now().date_naive())
    }
}
