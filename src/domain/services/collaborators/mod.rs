use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::EventSnapshot;

pub mod static_directory;

pub use static_directory::{StaticEventDirectory, StaticUserDirectory};

/// Read access to events owned by the event service.
///
/// Calls are synchronous request/response from the engine's point of view; a
/// transport failure must be reported as `CollaboratorError::Unavailable` so
/// the enclosing admission operation aborts instead of using stale data.
#[async_trait]
pub trait EventInfoProvider: Send + Sync {
    /// Fetches a snapshot of the event.
    ///
    /// # Arguments
    /// * `event_id` - The event to read
    /// * `acting_user_id` - When present, the caller must be the event's organizer
    ///
    /// # Returns
    /// * `Ok(EventSnapshot)` - A fresh snapshot
    /// * `Err(CollaboratorError::EventNotFound)` - No such event
    /// * `Err(CollaboratorError::NotOrganizer)` - `acting_user_id` does not organize the event
    async fn get_event(
        &self,
        event_id: Uuid,
        acting_user_id: Option<Uuid>,
    ) -> Result<EventSnapshot, CollaboratorError>;
}

/// Confirms that user ids refer to real accounts.
#[async_trait]
pub trait UserExistenceChecker: Send + Sync {
    async fn exists_by_id(&self, user_id: Uuid) -> Result<bool, CollaboratorError>;
}

/// Errors reported by external collaborators.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The event does not exist.
    #[error("Event with id={0} was not found")]
    EventNotFound(Uuid),

    /// The acting user is not the event's organizer.
    #[error("User {user_id} is not the organizer of event {event_id}")]
    NotOrganizer { event_id: Uuid, user_id: Uuid },

    /// The collaborator could not be reached or failed.
    #[error("Collaborator unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

#[cfg(test)]
use mockall::*;

#[cfg(test)]
mock! {
    pub EventInfoProvider {}

    #[async_trait]
    impl EventInfoProvider for EventInfoProvider {
        async fn get_event(&self, event_id: Uuid, acting_user_id: Option<Uuid>) -> Result<EventSnapshot, CollaboratorError>;
    }
}

#[cfg(test)]
mock! {
    pub UserExistenceChecker {}

    #[async_trait]
    impl UserExistenceChecker for UserExistenceChecker {
        async fn exists_by_id(&self, user_id: Uuid) -> Result<bool, CollaboratorError>;
    }
}
