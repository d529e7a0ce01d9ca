//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                 | Description                                       | Key Methods       |
// |----------------------|---------------------------------------------------|-------------------|
// | InMemoryRequestStore | RequestStore backed by process memory             | insert            |
// |                      |                                                   | save_all          |
// |                      |                                                   | count_confirmed_  |
// |                      |                                                   |   for_events      |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::types::{NewParticipationRequest, ParticipationRequest, RequestStatus};

use super::{RequestStore, StoreError};

#[derive(Default)]
struct Tables {
    /// Rows keyed by request id
    rows: HashMap<Uuid, ParticipationRequest>,
    /// Unique index on (requester, event)
    by_pair: HashMap<(Uuid, Uuid), Uuid>,
}

/// Request store that keeps every row in memory.
///
/// Both tables sit behind a single `RwLock`, so multi-row writes are atomic
/// with respect to every reader.
#[derive(Default)]
pub struct InMemoryRequestStore {
    tables: RwLock<Tables>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.tables.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sorted_by_creation(mut requests: Vec<ParticipationRequest>) -> Vec<ParticipationRequest> {
    requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    requests
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: NewParticipationRequest) -> Result<ParticipationRequest, StoreError> {
        let mut tables = self.tables.write();
        let key = (request.requester_id, request.event_id);

        if tables.by_pair.contains_key(&key) {
            return Err(StoreError::DuplicateRequest {
                requester_id: request.requester_id,
                event_id: request.event_id,
            });
        }

        let stored = request.with_id(Uuid::new_v4());
        tables.by_pair.insert(key, stored.id);
        tables.rows.insert(stored.id, stored.clone());

        debug!("Inserted participation request {} with status {}", stored.id, stored.status);
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ParticipationRequest>, StoreError> {
        Ok(self.tables.read().rows.get(&id).cloned())
    }

    async fn find_all_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ParticipationRequest>, StoreError> {
        let tables = self.tables.read();
        let unique: HashSet<&Uuid> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| tables.rows.get(id).cloned())
            .collect())
    }

    async fn find_all_by_requester(&self, requester_id: Uuid) -> Result<Vec<ParticipationRequest>, StoreError> {
        let matching = self
            .tables
            .read()
            .rows
            .values()
            .filter(|r| r.requester_id == requester_id)
            .cloned()
            .collect();
        Ok(sorted_by_creation(matching))
    }

    async fn find_all_by_event(&self, event_id: Uuid) -> Result<Vec<ParticipationRequest>, StoreError> {
        let matching = self
            .tables
            .read()
            .rows
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        Ok(sorted_by_creation(matching))
    }

    async fn exists_by_requester_and_event(
        &self,
        requester_id: Uuid,
        event_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.read().by_pair.contains_key(&(requester_id, event_id)))
    }

    async fn count_by_event_and_status(
        &self,
        event_id: Uuid,
        status: RequestStatus,
    ) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .read()
            .rows
            .values()
            .filter(|r| r.event_id == event_id && r.status == status)
            .count())
    }

    async fn count_confirmed_for_events(
        &self,
        event_ids: &HashSet<Uuid>,
    ) -> Result<HashMap<Uuid, usize>, StoreError> {
        let tables = self.tables.read();
        let mut counts = HashMap::new();
        for request in tables.rows.values() {
            if request.status == RequestStatus::Confirmed && event_ids.contains(&request.event_id) {
                *counts.entry(request.event_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn save(&self, request: ParticipationRequest) -> Result<ParticipationRequest, StoreError> {
        let mut tables = self.tables.write();
        match tables.rows.get_mut(&request.id) {
            Some(row) => {
                *row = request.clone();
                Ok(request)
            }
            None => Err(StoreError::NotFound(request.id)),
        }
    }

    async fn save_all(&self, requests: &[ParticipationRequest]) -> Result<(), StoreError> {
        let mut tables = self.tables.write();

        // Validate everything before the first write
        if let Some(missing) = requests.iter().find(|r| !tables.rows.contains_key(&r.id)) {
            return Err(StoreError::NotFound(missing.id));
        }

        for request in requests {
            tables.rows.insert(request.id, request.clone());
        }

        debug!("Saved {} participation requests", requests.len());
        Ok(())
    }
}
