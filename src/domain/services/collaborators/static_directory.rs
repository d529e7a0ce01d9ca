//! In-process directories standing in for the event and user services.
//!
//! The binary, the integration tests and the benchmarks wire these in where a
//! deployment would use network clients.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::types::EventSnapshot;

use super::{CollaboratorError, EventInfoProvider, UserExistenceChecker};

/// Event snapshots held in memory, keyed by event id.
#[derive(Default)]
pub struct StaticEventDirectory {
    events: RwLock<HashMap<Uuid, EventSnapshot>>,
}

impl StaticEventDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an event.
    pub fn upsert(&self, snapshot: EventSnapshot) {
        self.events.write().insert(snapshot.event_id, snapshot);
    }

    pub fn remove(&self, event_id: &Uuid) -> Option<EventSnapshot> {
        self.events.write().remove(event_id)
    }
}

#[async_trait]
impl EventInfoProvider for StaticEventDirectory {
    async fn get_event(
        &self,
        event_id: Uuid,
        acting_user_id: Option<Uuid>,
    ) -> Result<EventSnapshot, CollaboratorError> {
        let snapshot = self
            .events
            .read()
            .get(&event_id)
            .cloned()
            .ok_or(CollaboratorError::EventNotFound(event_id))?;

        match acting_user_id {
            Some(user_id) if user_id != snapshot.organizer_id => {
                debug!("User {} denied organizer access to event {}", user_id, event_id);
                Err(CollaboratorError::NotOrganizer { event_id, user_id })
            }
            _ => Ok(snapshot),
        }
    }
}

/// Set of known user ids.
#[derive(Default)]
pub struct StaticUserDirectory {
    users: RwLock<HashSet<Uuid>>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I: IntoIterator<Item = Uuid>>(users: I) -> Self {
        Self {
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    pub fn register(&self, user_id: Uuid) {
        self.users.write().insert(user_id);
    }
}

#[async_trait]
impl UserExistenceChecker for StaticUserDirectory {
    async fn exists_by_id(&self, user_id: Uuid) -> Result<bool, CollaboratorError> {
        Ok(self.users.read().contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::PublicationState;

    #[tokio::test]
    async fn test_scoped_lookup_requires_organizer() {
        let directory = StaticEventDirectory::new();
        let organizer = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        directory.upsert(EventSnapshot {
            event_id,
            organizer_id: organizer,
            publication_state: PublicationState::Published,
            participant_limit: 3,
            moderation_enabled: true,
        });

        assert!(directory.get_event(event_id, None).await.is_ok());
        assert!(directory.get_event(event_id, Some(organizer)).await.is_ok());

        let stranger = Uuid::new_v4();
        let denied = directory.get_event(event_id, Some(stranger)).await;
        assert!(matches!(denied, Err(CollaboratorError::NotOrganizer { user_id, .. }) if user_id == stranger));

        let missing = directory.get_event(Uuid::new_v4(), None).await;
        assert!(matches!(missing, Err(CollaboratorError::EventNotFound(_))));

        assert!(directory.remove(&event_id).is_some());
        assert!(directory.get_event(event_id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_user_directory() {
        let known = Uuid::new_v4();
        let users = StaticUserDirectory::with_users([known]);
        assert!(users.exists_by_id(known).await.unwrap());
        assert!(!users.exists_by_id(Uuid::new_v4()).await.unwrap());
    }
}
