//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The admission engine owns every status transition of a participation request.
//
// Each mutating operation follows the same shape:
//   1. fetch the event snapshot (and check the user) outside any lock
//   2. take the per-event lock
//   3. run the rule checks against the store, then write
//   4. release the lock and publish audit events
//
// Holding the event's lock across the confirmed-count read and the write is what
// keeps the participant limit from being overshot by concurrent callers.
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Key Methods             |
// |--------------------|---------------------------------------------------|-------------------------|
// | AdmissionEngine    | AdmissionService over a store and collaborators   | create_request          |
// |                    |                                                   | cancel_request          |
// |                    |                                                   | update_request_statuses |
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Return Type             |
// |--------------------|---------------------------------------------------|-------------------------|
// | admit_batch        | Capacity-aware partition of a confirm batch       | AdmissionResult<...>    |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::types::{
    EventSnapshot, NewParticipationRequest, ParticipationRequest, RequestStatus, StatusUpdateResult,
    StatusUpdateTarget,
};
use crate::domain::services::collaborators::{EventInfoProvider, UserExistenceChecker};
use crate::domain::services::enrichment::ConfirmedCountSource;
use crate::domain::services::event_locks::EventLocks;
use crate::domain::services::events::{EventBus, RequestEvent};
use crate::domain::services::request_store::RequestStore;

use super::{AdmissionError, AdmissionResult, AdmissionService};

/// Admission engine over a request store and the two external collaborators.
pub struct AdmissionEngine {
    store: Arc<dyn RequestStore>,
    event_info: Arc<dyn EventInfoProvider>,
    users: Arc<dyn UserExistenceChecker>,
    locks: EventLocks,
    event_bus: Option<EventBus>,
}

impl AdmissionEngine {
    /// Creates an engine without an audit bus.
    pub fn new(
        store: Arc<dyn RequestStore>,
        event_info: Arc<dyn EventInfoProvider>,
        users: Arc<dyn UserExistenceChecker>,
    ) -> Self {
        Self {
            store,
            event_info,
            users,
            locks: EventLocks::new(),
            event_bus: None,
        }
    }

    /// Publishes committed changes on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// The per-event lock registry.
    pub fn event_locks(&self) -> &EventLocks {
        &self.locks
    }

    async fn fetch_event(&self, event_id: Uuid, acting_user_id: Option<Uuid>) -> AdmissionResult<EventSnapshot> {
        Ok(self.event_info.get_event(event_id, acting_user_id).await?)
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> AdmissionResult<()> {
        if self.users.exists_by_id(user_id).await? {
            Ok(())
        } else {
            Err(AdmissionError::user_not_found(user_id))
        }
    }

    async fn confirmed_count(&self, event_id: Uuid) -> AdmissionResult<usize> {
        let confirmed = self
            .store
            .count_by_event_and_status(event_id, RequestStatus::Confirmed)
            .await?;
        debug!("event: {}, confirmed requests: {}", event_id, confirmed);
        Ok(confirmed)
    }

    fn publish(&self, events: Vec<RequestEvent>) {
        let Some(bus) = &self.event_bus else {
            return;
        };
        for event in events {
            if let Err(e) = bus.publish(event) {
                warn!("Audit event dropped: {}", e);
            }
        }
    }

    /// Loads the named requests in caller order, failing the whole batch on
    /// any unknown id, foreign request or non-pending status.
    async fn load_pending_batch(
        &self,
        event_id: Uuid,
        request_ids: &[Uuid],
    ) -> AdmissionResult<Vec<ParticipationRequest>> {
        let mut found: HashMap<Uuid, ParticipationRequest> = self
            .store
            .find_all_by_ids(request_ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let mut batch = Vec::with_capacity(request_ids.len());
        for id in request_ids {
            let request = found
                .remove(id)
                .ok_or_else(|| AdmissionError::request_not_found(*id))?;

            if request.event_id != event_id {
                return Err(AdmissionError::ConditionNotMet(format!(
                    "Request {} does not belong to event {}",
                    request.id, event_id
                )));
            }
            batch.push(request);
        }

        if batch.iter().any(|r| !r.is_pending()) {
            return Err(AdmissionError::ConditionNotMet(
                "Request must have status PENDING".to_string(),
            ));
        }

        Ok(batch)
    }
}

/// Drops repeated ids, keeping the position of the first occurrence.
fn dedup_preserving_order(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Partitions a batch of pending requests into confirmed and rejected.
///
/// Under moderation with a participant limit, requests are confirmed in the
/// given order while slots remain and rejected afterwards. In auto-confirm mode
/// (no limit, or moderation off) every request is confirmed.
///
/// # Errors
/// * `ConditionNotMet` - Capacity is enforced and already exhausted
pub fn admit_batch(
    snapshot: &EventSnapshot,
    confirmed_count: usize,
    requests: Vec<ParticipationRequest>,
) -> AdmissionResult<StatusUpdateResult> {
    let limit = snapshot.participant_limit as usize;

    if snapshot.enforces_capacity() && confirmed_count >= limit {
        return Err(AdmissionError::ConditionNotMet(
            "The participant limit of the event has been reached".to_string(),
        ));
    }

    let mut available = limit.saturating_sub(confirmed_count);
    let mut result = StatusUpdateResult::default();

    for mut request in requests {
        if snapshot.auto_confirms() {
            request.status = RequestStatus::Confirmed;
            result.confirmed_requests.push(request);
        } else if available > 0 {
            request.status = RequestStatus::Confirmed;
            result.confirmed_requests.push(request);
            available -= 1;
        } else {
            request.status = RequestStatus::Rejected;
            result.rejected_requests.push(request);
        }
    }

    Ok(result)
}

fn reject_all(requests: Vec<ParticipationRequest>) -> StatusUpdateResult {
    StatusUpdateResult {
        confirmed_requests: Vec::new(),
        rejected_requests: requests
            .into_iter()
            .map(|mut r| {
                r.status = RequestStatus::Rejected;
                r
            })
            .collect(),
    }
}

#[async_trait]
impl AdmissionService for AdmissionEngine {
    async fn create_request(&self, requester_id: Uuid, event_id: Uuid) -> AdmissionResult<ParticipationRequest> {
        debug!("User {} is requesting to participate in event {}", requester_id, event_id);

        let snapshot = self.fetch_event(event_id, None).await?;
        self.ensure_user_exists(requester_id).await?;

        let guard = self.locks.lock(event_id).await;

        if self.store.exists_by_requester_and_event(requester_id, event_id).await? {
            return Err(AdmissionError::ConditionNotMet(
                "Participation request has already been sent.".to_string(),
            ));
        }
        if snapshot.organizer_id == requester_id {
            return Err(AdmissionError::ConditionNotMet(
                "Organizer cannot participate in their own event.".to_string(),
            ));
        }
        if !snapshot.is_published() {
            return Err(AdmissionError::ConditionNotMet(
                "Cannot participate in an unpublished event.".to_string(),
            ));
        }
        if snapshot.participant_limit > 0
            && self.confirmed_count(event_id).await? >= snapshot.participant_limit as usize
        {
            return Err(AdmissionError::ConditionNotMet(
                "Event participant limit has been reached.".to_string(),
            ));
        }

        let mut new_request = NewParticipationRequest::pending(requester_id, event_id);
        if snapshot.auto_confirms() {
            new_request.status = RequestStatus::Confirmed;
        }
        let request = self.store.insert(new_request).await?;
        drop(guard);

        info!(
            "Created request {} from user {} for event {} with status {}",
            request.id, requester_id, event_id, request.status
        );
        self.publish(vec![RequestEvent::RequestCreated {
            request: request.clone(),
            timestamp: Utc::now(),
        }]);

        Ok(request)
    }

    async fn get_user_requests(&self, requester_id: Uuid) -> AdmissionResult<Vec<ParticipationRequest>> {
        self.ensure_user_exists(requester_id).await?;
        Ok(self.store.find_all_by_requester(requester_id).await?)
    }

    async fn get_requests_for_event(
        &self,
        event_id: Uuid,
        organizer_id: Uuid,
    ) -> AdmissionResult<Vec<ParticipationRequest>> {
        debug!("getRequestsForEvent: {} of user: {}", event_id, organizer_id);
        self.fetch_event(event_id, Some(organizer_id)).await?;
        Ok(self.store.find_all_by_event(event_id).await?)
    }

    async fn cancel_request(&self, requester_id: Uuid, request_id: Uuid) -> AdmissionResult<ParticipationRequest> {
        debug!("User {} is canceling request {}", requester_id, request_id);

        let request = self
            .store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AdmissionError::request_not_found(request_id))?;

        if request.requester_id != requester_id {
            return Err(AdmissionError::Forbidden(
                "Only the author of the request can cancel it.".to_string(),
            ));
        }

        // Canceling a confirmed request frees a slot, so this is a capacity write too
        let guard = self.locks.lock(request.event_id).await;

        let mut request = self
            .store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AdmissionError::request_not_found(request_id))?;
        let previous_status = request.status;
        request.status = RequestStatus::Canceled;
        let request = self.store.save(request).await?;
        drop(guard);

        info!(
            "Canceled request {} of user {} (was {})",
            request_id, requester_id, previous_status
        );
        self.publish(vec![RequestEvent::RequestCanceled {
            request: request.clone(),
            previous_status,
            timestamp: Utc::now(),
        }]);

        Ok(request)
    }

    async fn update_request_statuses(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        target: StatusUpdateTarget,
        request_ids: Vec<Uuid>,
    ) -> AdmissionResult<StatusUpdateResult> {
        debug!(
            "Organizer {} sets {} requests of event {} to {:?}",
            organizer_id,
            request_ids.len(),
            event_id,
            target
        );

        let snapshot = self.fetch_event(event_id, Some(organizer_id)).await?;
        if !snapshot.is_published() {
            return Err(AdmissionError::ConditionNotMet(
                "Cannot participate in an unpublished event.".to_string(),
            ));
        }

        let request_ids = dedup_preserving_order(request_ids);

        let guard = self.locks.lock(event_id).await;

        let batch = self.load_pending_batch(event_id, &request_ids).await?;
        let result = match target {
            StatusUpdateTarget::Rejected => reject_all(batch),
            StatusUpdateTarget::Confirmed => {
                let confirmed_count = self.confirmed_count(event_id).await?;
                admit_batch(&snapshot, confirmed_count, batch)?
            }
        };

        let changed: Vec<ParticipationRequest> = result
            .confirmed_requests
            .iter()
            .chain(result.rejected_requests.iter())
            .cloned()
            .collect();
        self.store.save_all(&changed).await?;
        drop(guard);

        info!(
            "Event {}: {} requests confirmed, {} rejected",
            event_id,
            result.confirmed_requests.len(),
            result.rejected_requests.len()
        );

        let timestamp = Utc::now();
        let mut audit: Vec<RequestEvent> = changed
            .iter()
            .map(|r| RequestEvent::RequestStatusChanged {
                request_id: r.id,
                event_id,
                previous_status: RequestStatus::Pending,
                new_status: r.status,
                timestamp,
            })
            .collect();
        audit.push(RequestEvent::BatchProcessed {
            event_id,
            target,
            confirmed: result.confirmed_ids(),
            rejected: result.rejected_ids(),
            timestamp,
        });
        self.publish(audit);

        Ok(result)
    }

    async fn get_confirmed_requests(&self, event_ids: &HashSet<Uuid>) -> AdmissionResult<HashMap<Uuid, usize>> {
        debug!("Counting confirmed requests for events: {:?}", event_ids);
        Ok(self.store.count_confirmed_for_events(event_ids).await?)
    }
}

#[async_trait]
impl ConfirmedCountSource for AdmissionEngine {
    async fn confirmed_counts(&self, event_ids: &HashSet<Uuid>) -> AdmissionResult<HashMap<Uuid, usize>> {
        self.get_confirmed_requests(event_ids).await
    }
}
