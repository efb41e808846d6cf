// Protocol-agnostic reservation operations. One instance is shared by all
// adapters; the store handle is injected at construction (no process-wide
// singleton connection).

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{DomainError, Reservation, ReservationDraft, ReservationPatch};
use crate::store::{ReservationStore, StoreError};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline applied to every operation; exceeded deadlines surface as
    /// [`DomainError::Timeout`] instead of hanging the adapter.
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
    config: ServiceConfig,
}

impl ReservationService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: Arc<dyn ReservationStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// All reservations, expanded, in id-assignment order.
    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, DomainError> {
        self.with_deadline(self.store.fetch_all()).await?
            .map_err(DomainError::from)
    }

    pub async fn get_reservation(&self, id: &str) -> Result<Reservation, DomainError> {
        self.with_deadline(self.store.fetch(id))
            .await??
            .ok_or_else(|| DomainError::NotFound(id.to_string()))
    }

    /// Creates a new client, a new room, and a reservation linking them.
    ///
    /// The name is deliberate: every creation mints fresh party records, and
    /// there is no way to attach an existing client or room. That mirrors
    /// the documented product behavior, gap included.
    pub async fn create_reservation_with_new_parties(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, DomainError> {
        draft.validate()?;
        let reservation = self.with_deadline(self.store.insert(draft)).await??;
        debug!(id = %reservation.id, "reservation created");
        Ok(reservation)
    }

    /// Partial update of dates/preferences. Fields absent from the patch are
    /// left untouched. The store validates the merged date invariant under
    /// its per-record lock, so two racing partial patches can never leave an
    /// inverted range; a losing merge surfaces as a validation failure.
    pub async fn update_reservation(
        &self,
        id: &str,
        patch: ReservationPatch,
    ) -> Result<Reservation, DomainError> {
        match self.with_deadline(self.store.apply_patch(id, patch)).await? {
            Ok(Some(reservation)) => Ok(reservation),
            Ok(None) => Err(DomainError::NotFound(id.to_string())),
            Err(err @ StoreError::InvertedDates { .. }) => {
                Err(DomainError::Validation(err.to_string()))
            }
            Err(err) => Err(DomainError::Store(err)),
        }
    }

    /// Deletes a reservation, reporting plain success/failure. Every failure
    /// kind (unknown id, closed store, timeout) collapses to `false` here;
    /// a deliberate simplification of the delete contract, kept so that
    /// deleting a missing id never looks like success.
    pub async fn delete_reservation(&self, id: &str) -> bool {
        match self.with_deadline(self.store.remove(id)).await {
            Ok(Ok(removed)) => removed,
            Ok(Err(err)) => {
                warn!(id, %err, "delete failed at store");
                false
            }
            Err(err) => {
                warn!(id, %err, "delete timed out");
                false
            }
        }
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = T>,
    ) -> Result<T, DomainError> {
        let timeout = self.config.request_timeout;
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| DomainError::Timeout(timeout.as_millis() as u64))
    }
}
