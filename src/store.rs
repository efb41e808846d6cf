// Durable store boundary. The gateway only ever talks to the trait below;
// the in-memory implementation is the reference store used by tests and by
// deployments that front a real database behind the same interface.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Client, Reservation, ReservationDraft, ReservationPatch, Room};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store is closed")]
    Closed,

    #[error("referential link broken: {0}")]
    BrokenLink(String),

    #[error("dateDebut {start} is after dateFin {end}")]
    InvertedDates { start: NaiveDate, end: NaiveDate },
}

/// CRUD over client/room/reservation records with referential linking.
/// Implementations must serialize writes per reservation id and provide
/// read-after-write consistency: a successful `insert` is visible to any
/// subsequent `fetch`/`fetch_all`.
#[async_trait]
pub trait ReservationStore: Send + Sync + 'static {
    /// Persists a new client, a new room, and a reservation linking them.
    /// Returns the expanded reservation with freshly assigned ids.
    async fn insert(&self, draft: ReservationDraft) -> Result<Reservation, StoreError>;

    async fn fetch(&self, id: &str) -> Result<Option<Reservation>, StoreError>;

    /// All reservations in id-assignment order, each expanded.
    async fn fetch_all(&self) -> Result<Vec<Reservation>, StoreError>;

    /// Applies the present fields of `patch` under the per-record lock.
    /// The merged dates are validated under that same lock, so racing
    /// partial patches can never leave `start_date > end_date` persisted;
    /// a losing merge fails with [`StoreError::InvertedDates`]. Returns
    /// `None` when the id is unknown. Last writer wins.
    async fn apply_patch(
        &self,
        id: &str,
        patch: ReservationPatch,
    ) -> Result<Option<Reservation>, StoreError>;

    /// Removes the reservation and its exclusively-owned client and room.
    /// Returns whether a reservation was actually removed.
    async fn remove(&self, id: &str) -> Result<bool, StoreError>;
}

// Reservation row as stored: relations are held by id and joined on read.
#[derive(Debug, Clone)]
struct ReservationRecord {
    seq: u64,
    client_id: String,
    room_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    preferences: Option<String>,
}

/// In-memory store with an explicit open/close lifecycle. Construct one
/// handle at startup, share it behind an `Arc`, close it on shutdown;
/// operations on a closed handle fail with [`StoreError::Closed`].
pub struct InMemoryStore {
    clients: DashMap<String, Client>,
    rooms: DashMap<String, Room>,
    reservations: DashMap<String, ReservationRecord>,
    seq: Mutex<u64>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn open() -> Self {
        Self {
            clients: DashMap::new(),
            rooms: DashMap::new(),
            reservations: DashMap::new(),
            seq: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        debug!("in-memory store closed");
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn next_id(&self) -> (u64, String) {
        let mut seq = self.seq.lock();
        *seq += 1;
        (*seq, seq.to_string())
    }

    fn expand(&self, id: &str, record: &ReservationRecord) -> Result<Reservation, StoreError> {
        let client = self.clients.get(&record.client_id).ok_or_else(|| {
            warn!(reservation = id, client = %record.client_id, "client record missing");
            StoreError::BrokenLink(format!("client {} of reservation {}", record.client_id, id))
        })?;
        let room = self.rooms.get(&record.room_id).ok_or_else(|| {
            warn!(reservation = id, room = %record.room_id, "room record missing");
            StoreError::BrokenLink(format!("room {} of reservation {}", record.room_id, id))
        })?;

        Ok(Reservation {
            id: id.to_string(),
            client: client.clone(),
            room: room.clone(),
            start_date: record.start_date,
            end_date: record.end_date,
            preferences: record.preferences.clone(),
        })
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn insert(&self, draft: ReservationDraft) -> Result<Reservation, StoreError> {
        self.ensure_open()?;

        let (_, client_id) = self.next_id();
        let (_, room_id) = self.next_id();
        let (seq, reservation_id) = self.next_id();

        let client = Client {
            id: client_id.clone(),
            last_name: draft.client.last_name,
            first_name: draft.client.first_name,
            email: draft.client.email,
            phone: draft.client.phone,
        };
        let room = Room {
            id: room_id.clone(),
            room_type: draft.room.room_type,
            price: draft.room.price,
            available: draft.room.available,
        };

        self.clients.insert(client_id.clone(), client.clone());
        self.rooms.insert(room_id.clone(), room.clone());
        self.reservations.insert(
            reservation_id.clone(),
            ReservationRecord {
                seq,
                client_id,
                room_id,
                start_date: draft.start_date,
                end_date: draft.end_date,
                preferences: draft.preferences.clone(),
            },
        );

        debug!(id = %reservation_id, "reservation inserted");
        Ok(Reservation {
            id: reservation_id,
            client,
            room,
            start_date: draft.start_date,
            end_date: draft.end_date,
            preferences: draft.preferences,
        })
    }

    async fn fetch(&self, id: &str) -> Result<Option<Reservation>, StoreError> {
        self.ensure_open()?;
        match self.reservations.get(id) {
            Some(record) => self.expand(id, &record).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Reservation>, StoreError> {
        self.ensure_open()?;

        let mut rows: Vec<(u64, String, ReservationRecord)> = self
            .reservations
            .iter()
            .map(|entry| (entry.value().seq, entry.key().clone(), entry.value().clone()))
            .collect();
        rows.sort_by_key(|(seq, _, _)| *seq);

        rows.iter()
            .map(|(_, id, record)| self.expand(id, record))
            .collect()
    }

    async fn apply_patch(
        &self,
        id: &str,
        patch: ReservationPatch,
    ) -> Result<Option<Reservation>, StoreError> {
        self.ensure_open()?;

        // get_mut holds the shard lock for this key, serializing
        // concurrent updates to the same reservation. The merged dates are
        // checked while the lock is held; validating against any earlier
        // snapshot would let two crossing partial patches invert the range.
        let record = match self.reservations.get_mut(id) {
            Some(mut record) => {
                let start = patch.start_date.unwrap_or(record.start_date);
                let end = patch.end_date.unwrap_or(record.end_date);
                if start > end {
                    return Err(StoreError::InvertedDates { start, end });
                }
                record.start_date = start;
                record.end_date = end;
                if let Some(preferences) = patch.preferences {
                    record.preferences = Some(preferences);
                }
                record.clone()
            }
            None => return Ok(None),
        };

        debug!(id, "reservation patched");
        self.expand(id, &record).map(Some)
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;

        // Cascade: the client and room were created with this reservation
        // and are owned by it exclusively.
        match self.reservations.remove(id) {
            Some((_, record)) => {
                self.clients.remove(&record.client_id);
                self.rooms.remove(&record.room_id);
                debug!(id, "reservation removed");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
