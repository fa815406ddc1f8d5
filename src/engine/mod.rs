mod availability;
mod error;
mod mutations;
mod queries;
mod validate;

pub use availability::{check_no_conflict, evaluate_stay, BookingPolicy};
pub use error::EngineError;
pub use mutations::{GuestPatch, RoomPatch};

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::model::*;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    respond_batch(batch, &result);
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── Engine ───────────────────────────────────────────────

pub struct Engine {
    /// One lock per room; the write lock is the booking commit boundary.
    rooms: DashMap<i64, SharedRoomState>,
    /// Unique room_number → room id.
    room_numbers: DashMap<String, i64>,
    guests: DashMap<i64, Guest>,
    /// Unique email → guest id.
    emails: DashMap<String, i64>,
    payments: DashMap<i64, Payment>,
    /// Reverse lookup: booking id → room id.
    booking_to_room: DashMap<i64, i64>,
    policy: BookingPolicy,
    wal_tx: mpsc::Sender<WalCommand>,
    next_room_id: AtomicI64,
    next_guest_id: AtomicI64,
    next_booking_id: AtomicI64,
    next_payment_id: AtomicI64,
}

/// Apply an event to a RoomState (no locking — caller holds the lock).
/// Shared by the live mutation path and WAL replay so both produce
/// identical state.
fn apply_to_room(
    rs: &mut RoomState,
    event: &Event,
    booking_to_room: &DashMap<i64, i64>,
    payments: &DashMap<i64, Payment>,
) {
    match event {
        Event::BookingCreated { booking } => {
            rs.insert_booking(booking.clone());
            booking_to_room.insert(booking.id, booking.room_id);
        }
        Event::BookingTransitioned { id, status, .. } => {
            let prior = rs.booking(*id).map(|b| b.status);
            if let Some(b) = rs.booking_mut(*id) {
                b.status = *status;
            }
            // Check-in occupies the room; check-out (or cancelling an
            // occupied stay) releases it.
            if let Some(prior) = prior {
                match (prior, *status) {
                    (_, BookingStatus::CheckedIn) => rs.room.status = RoomStatus::Booked,
                    (_, BookingStatus::CheckedOut) => rs.room.status = RoomStatus::Available,
                    (BookingStatus::CheckedIn, BookingStatus::Cancelled) => {
                        rs.room.status = RoomStatus::Available;
                    }
                    _ => {}
                }
            }
        }
        Event::PaymentRecorded { payment } => {
            if let Some(b) = rs.booking_mut(payment.booking_id) {
                b.payment_status = true;
            }
            payments.insert(payment.id, payment.clone());
        }
        Event::RoomUpdated {
            room_type,
            rate,
            status,
            capacity,
            last_changed_date,
            ..
        } => {
            rs.room.room_type = *room_type;
            rs.room.rate = *rate;
            rs.room.status = *status;
            rs.room.capacity = *capacity;
            rs.room.last_changed_date = *last_changed_date;
        }
        // Registry-level events are handled at the DashMap level, not here
        Event::RoomCreated { .. }
        | Event::RoomDeleted { .. }
        | Event::GuestCreated { .. }
        | Event::GuestUpdated { .. }
        | Event::GuestDeleted { .. } => {}
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf, policy: BookingPolicy) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            rooms: DashMap::new(),
            room_numbers: DashMap::new(),
            guests: DashMap::new(),
            emails: DashMap::new(),
            payments: DashMap::new(),
            booking_to_room: DashMap::new(),
            policy,
            wal_tx,
            next_room_id: AtomicI64::new(1),
            next_guest_id: AtomicI64::new(1),
            next_booking_id: AtomicI64::new(1),
            next_payment_id: AtomicI64::new(1),
        };

        // Replay — we're the sole owner of these Arcs, so try_read/try_write
        // always succeed instantly (no contention).
        for event in &events {
            engine.replay_event(event);
        }

        Ok(engine)
    }

    fn replay_event(&self, event: &Event) {
        match event {
            Event::RoomCreated { room } => {
                self.next_room_id.fetch_max(room.id + 1, Ordering::Relaxed);
                self.room_numbers.insert(room.room_number.clone(), room.id);
                self.rooms
                    .insert(room.id, Arc::new(RwLock::new(RoomState::new(room.clone()))));
            }
            Event::RoomDeleted { id } => {
                if let Some((_, rs)) = self.rooms.remove(id) {
                    let guard = rs.try_read().expect("replay: uncontended read");
                    let booking_ids: Vec<i64> = guard.bookings.iter().map(|b| b.id).collect();
                    self.room_numbers.remove(&guard.room.room_number);
                    drop(guard);
                    self.purge_bookings(&booking_ids);
                }
            }
            Event::GuestCreated { guest } | Event::GuestUpdated { guest } => {
                self.next_guest_id.fetch_max(guest.id + 1, Ordering::Relaxed);
                let old_email = self.guests.get(&guest.id).map(|g| g.email.clone());
                if let Some(old_email) = old_email
                    && old_email != guest.email
                {
                    self.emails.remove(&old_email);
                }
                self.emails.insert(guest.email.clone(), guest.id);
                self.guests.insert(guest.id, guest.clone());
            }
            Event::GuestDeleted { id } => {
                self.remove_guest_cascade_replay(*id);
            }
            other => {
                if let Event::BookingCreated { booking } = other {
                    self.next_booking_id
                        .fetch_max(booking.id + 1, Ordering::Relaxed);
                }
                if let Event::PaymentRecorded { payment } = other {
                    self.next_payment_id
                        .fetch_max(payment.id + 1, Ordering::Relaxed);
                }
                if let Some(room_id) = self.replay_room_id(other)
                    && let Some(entry) = self.rooms.get(&room_id)
                {
                    let rs_arc = entry.clone();
                    drop(entry);
                    let mut guard = rs_arc.try_write().expect("replay: uncontended write");
                    apply_to_room(&mut guard, other, &self.booking_to_room, &self.payments);
                }
            }
        }
    }

    /// Route a room-scoped event to its room during replay. Payments go
    /// through the booking index, which earlier replayed events populated.
    fn replay_room_id(&self, event: &Event) -> Option<i64> {
        match event {
            Event::BookingCreated { booking } => Some(booking.room_id),
            Event::BookingTransitioned { room_id, .. } => Some(*room_id),
            Event::RoomUpdated { id, .. } => Some(*id),
            Event::PaymentRecorded { payment } => self.room_for_booking(payment.booking_id),
            _ => None,
        }
    }

    /// Replay-path guest cascade: locks are provably uncontended.
    fn remove_guest_cascade_replay(&self, guest_id: i64) {
        if let Some((_, guest)) = self.guests.remove(&guest_id) {
            self.emails.remove(&guest.email);
        }
        let mut removed = Vec::new();
        for entry in self.rooms.iter() {
            let rs_arc = entry.value().clone();
            let mut guard = rs_arc.try_write().expect("replay: uncontended write");
            guard.bookings.retain(|b| {
                if b.guest_id == guest_id {
                    removed.push(b.id);
                    false
                } else {
                    true
                }
            });
        }
        self.purge_bookings(&removed);
    }

    /// Drop index entries and payments belonging to removed bookings.
    pub(super) fn purge_bookings(&self, booking_ids: &[i64]) {
        for id in booking_ids {
            self.booking_to_room.remove(id);
        }
        if !booking_ids.is_empty() {
            self.payments
                .retain(|_, p| !booking_ids.contains(&p.booking_id));
        }
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append + apply in one call, while the caller holds the room's
    /// write lock. This is the commit boundary: nothing becomes visible
    /// before it is durable.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_room(rs, event, &self.booking_to_room, &self.payments);
        Ok(())
    }

    pub(super) fn room_state(&self, id: i64) -> Option<SharedRoomState> {
        self.rooms.get(&id).map(|e| e.value().clone())
    }

    pub fn room_for_booking(&self, booking_id: i64) -> Option<i64> {
        self.booking_to_room.get(&booking_id).map(|e| *e.value())
    }

    pub fn room_id_by_number(&self, number: &str) -> Option<i64> {
        self.room_numbers.get(number).map(|e| *e.value())
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Lookup booking → room, get the room, acquire its write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: i64,
    ) -> Result<(i64, tokio::sync::OwnedRwLockWriteGuard<RoomState>), EngineError> {
        let room_id = self
            .room_for_booking(booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        let rs = self
            .room_state(room_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        let guard = rs.write_owned().await;
        Ok((room_id, guard))
    }

    pub(super) fn alloc_room_id(&self) -> i64 {
        self.next_room_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn alloc_guest_id(&self) -> i64 {
        self.next_guest_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn alloc_booking_id(&self) -> i64 {
        self.next_booking_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn alloc_payment_id(&self) -> i64 {
        self.next_payment_id.fetch_add(1, Ordering::Relaxed)
    }
}
