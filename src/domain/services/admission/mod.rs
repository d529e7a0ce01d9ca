use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{
    EventRequestStatusUpdate, ParticipationRequest, StatusUpdateResult, StatusUpdateTarget,
    UnknownStatus,
};
use crate::domain::services::collaborators::CollaboratorError;
use crate::domain::services::request_store::StoreError;

pub mod admission_engine;


pub use admission_engine::{AdmissionEngine, admit_batch};

/// Type alias for Result with AdmissionError
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Operations the admission engine exposes to the rest of the system.
///
/// This is the only component allowed to change the status of a
/// participation request. Implementations must be safe to call from many
/// tasks at once.
#[async_trait]
pub trait AdmissionService: Send + Sync {
    /// Creates a request of `requester_id` to join `event_id`.
    ///
    /// The request starts `PENDING`, or `CONFIRMED` straight away when the
    /// event has no participant limit or does not moderate requests.
    ///
    /// # Errors
    /// * `NotFound` - The event or the requester does not exist
    /// * `ConditionNotMet` - Duplicate request, own event, unpublished event or no capacity left
    async fn create_request(&self, requester_id: Uuid, event_id: Uuid) -> AdmissionResult<ParticipationRequest>;

    /// Lists every request made by `requester_id`.
    async fn get_user_requests(&self, requester_id: Uuid) -> AdmissionResult<Vec<ParticipationRequest>>;

    /// Lists every request for `event_id`. Only the organizer may do this.
    async fn get_requests_for_event(
        &self,
        event_id: Uuid,
        organizer_id: Uuid,
    ) -> AdmissionResult<Vec<ParticipationRequest>>;

    /// Cancels a request on behalf of its author.
    ///
    /// # Errors
    /// * `NotFound` - No request with that id
    /// * `Forbidden` - `requester_id` is not the author of the request
    async fn cancel_request(&self, requester_id: Uuid, request_id: Uuid) -> AdmissionResult<ParticipationRequest>;

    /// Confirms or rejects a batch of pending requests of one event.
    ///
    /// The batch is all-or-nothing with respect to its preconditions: if any
    /// named request is not pending, nothing changes. When confirming under
    /// moderation, requests are admitted in the order given until the
    /// participant limit is reached and the rest are rejected.
    async fn update_request_statuses(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        target: StatusUpdateTarget,
        request_ids: Vec<Uuid>,
    ) -> AdmissionResult<StatusUpdateResult>;

    /// Confirmed request counts for the given events. Events with no confirmed
    /// requests are absent from the result.
    async fn get_confirmed_requests(&self, event_ids: &HashSet<Uuid>) -> AdmissionResult<HashMap<Uuid, usize>>;

    /// Validates a raw batch update and applies it.
    ///
    /// # Errors
    /// * `InvalidArgument` - The status is neither `CONFIRMED` nor `REJECTED`
    async fn apply_status_update(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        update: EventRequestStatusUpdate,
    ) -> AdmissionResult<StatusUpdateResult> {
        let target: StatusUpdateTarget = update.status.parse()?;
        self.update_request_statuses(organizer_id, event_id, target, update.request_ids)
            .await
    }
}

/// Errors that can occur during admission operations.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The referenced request, event or user does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller lacks the required relationship to the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A business rule would be violated.
    #[error("Condition not met: {0}")]
    ConditionNotMet(String),

    /// The caller supplied an unrecognized value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An external collaborator failed; the operation was aborted.
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// The request store failed.
    #[error("Request store failure: {0}")]
    Storage(#[source] anyhow::Error),
}

impl AdmissionError {
    pub(crate) fn request_not_found(request_id: Uuid) -> Self {
        Self::NotFound(format!("Participation request with id={} was not found", request_id))
    }

    pub(crate) fn user_not_found(user_id: Uuid) -> Self {
        Self::NotFound(format!("User with id={} was not found", user_id))
    }
}

impl From<CollaboratorError> for AdmissionError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::EventNotFound(_) => Self::NotFound(err.to_string()),
            CollaboratorError::NotOrganizer { .. } => Self::Forbidden(err.to_string()),
            CollaboratorError::Unavailable(source) => Self::Unavailable(source.to_string()),
        }
    }
}

impl From<StoreError> for AdmissionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::request_not_found(id),
            StoreError::DuplicateRequest { .. } => {
                Self::ConditionNotMet("Participation request has already been sent.".to_string())
            }
            StoreError::Backend(source) => Self::Storage(source),
        }
    }
}

impl From<UnknownStatus> for AdmissionError {
    fn from(err: UnknownStatus) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
