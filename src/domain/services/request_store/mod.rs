use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{NewParticipationRequest, ParticipationRequest, RequestStatus};

pub mod in_memory_store;

pub use in_memory_store::InMemoryRequestStore;

/// Durable collection of participation requests.
///
/// Rows are keyed by request id and queryable by event, by requester and by a
/// set of ids. Implementations must be thread-safe; `save_all` must be atomic.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Inserts a new request and assigns its id.
    ///
    /// # Returns
    /// * `Ok(ParticipationRequest)` - The stored row
    /// * `Err(StoreError::DuplicateRequest)` - A row for the same requester and event exists
    async fn insert(&self, request: NewParticipationRequest) -> Result<ParticipationRequest, StoreError>;

    /// Looks up a single request by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ParticipationRequest>, StoreError>;

    /// Returns the rows matching `ids`. Unknown ids are skipped; order is unspecified.
    async fn find_all_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ParticipationRequest>, StoreError>;

    /// All requests made by a user, oldest first.
    async fn find_all_by_requester(&self, requester_id: Uuid) -> Result<Vec<ParticipationRequest>, StoreError>;

    /// All requests targeting an event, oldest first.
    async fn find_all_by_event(&self, event_id: Uuid) -> Result<Vec<ParticipationRequest>, StoreError>;

    /// Whether any request exists for the pair, whatever its status.
    async fn exists_by_requester_and_event(
        &self,
        requester_id: Uuid,
        event_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Number of requests for `event_id` currently in `status`.
    async fn count_by_event_and_status(
        &self,
        event_id: Uuid,
        status: RequestStatus,
    ) -> Result<usize, StoreError>;

    /// Confirmed request counts per event. Events without confirmed requests are absent.
    async fn count_confirmed_for_events(
        &self,
        event_ids: &HashSet<Uuid>,
    ) -> Result<HashMap<Uuid, usize>, StoreError>;

    /// Overwrites an existing row.
    async fn save(&self, request: ParticipationRequest) -> Result<ParticipationRequest, StoreError>;

    /// Overwrites several existing rows in one atomic write.
    ///
    /// Either every row is written or, if any id is unknown, none is.
    async fn save_all(&self, requests: &[ParticipationRequest]) -> Result<(), StoreError>;
}

/// Errors that can occur during request store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request does not exist.
    #[error("Participation request {0} not found")]
    NotFound(Uuid),

    /// A request for the same requester and event already exists.
    #[error("Participation request of user {requester_id} for event {event_id} already exists")]
    DuplicateRequest {
        requester_id: Uuid,
        event_id: Uuid,
    },

    /// The storage backend failed.
    #[error("Request store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[cfg(test)]
use mockall::*;

#[cfg(test)]
mock! {
    pub RequestStore {}

    #[async_trait]
    impl RequestStore for RequestStore {
        async fn insert(&self, request: NewParticipationRequest) -> Result<ParticipationRequest, StoreError>;
        async fn find_by_id(&self, id: Uuid) -> Result<Option<ParticipationRequest>, StoreError>;
        async fn find_all_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ParticipationRequest>, StoreError>;
        async fn find_all_by_requester(&self, requester_id: Uuid) -> Result<Vec<ParticipationRequest>, StoreError>;
        async fn find_all_by_event(&self, event_id: Uuid) -> Result<Vec<ParticipationRequest>, StoreError>;
        async fn exists_by_requester_and_event(&self, requester_id: Uuid, event_id: Uuid) -> Result<bool, StoreError>;
        async fn count_by_event_and_status(&self, event_id: Uuid, status: RequestStatus) -> Result<usize, StoreError>;
        async fn count_confirmed_for_events(&self, event_ids: &HashSet<Uuid>) -> Result<HashMap<Uuid, usize>, StoreError>;
        async fn save(&self, request: ParticipationRequest) -> Result<ParticipationRequest, StoreError>;
        async fn save_all(&self, requests: &[ParticipationRequest]) -> Result<(), StoreError>;
    }
}
