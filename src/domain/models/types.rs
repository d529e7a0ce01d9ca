//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the admission engine,
// including participation requests, event snapshots and the status enums driving
// the request lifecycle.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Request lifecycle status, batch targets, publication state.      |
// | STRUCTS            | Requests, event snapshots, batch inputs and results.             |
// | TESTS              | Contains unit tests for the defined types.                       |
//--------------------------------------------------------------------------------------------------

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                          |
// |--------------------|------------------------------------------------------|
// | RequestStatus      | Lifecycle status of a participation request.         |
// | StatusUpdateTarget | Status an organizer may move a batch of requests to. |
// | PublicationState   | Whether an event is open to participation.           |
//--------------------------------------------------------------------------------------------------
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the lifecycle status of a participation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Waiting for the organizer's decision.
    Pending,
    /// Holds a slot against the event's participant limit.
    Confirmed,
    /// Turned down by the organizer or by lack of capacity.
    Rejected,
    /// Withdrawn by the requester.
    Canceled,
}

impl RequestStatus {
    /// Wire name of the status, as stored and reported.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status an organizer can move a batch of pending requests to.
///
/// Free-form status strings coming from callers are parsed into this enum at
/// the boundary; anything other than `CONFIRMED` or `REJECTED` is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusUpdateTarget {
    /// Admit the requests, capacity permitting.
    Confirmed,
    /// Turn all requests down.
    Rejected,
}

impl From<StatusUpdateTarget> for RequestStatus {
    fn from(target: StatusUpdateTarget) -> Self {
        match target {
            StatusUpdateTarget::Confirmed => RequestStatus::Confirmed,
            StatusUpdateTarget::Rejected => RequestStatus::Rejected,
        }
    }
}

/// Error returned when a status string is not a valid batch target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Incorrect status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for StatusUpdateTarget {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Publication state of an event as reported by the event service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationState {
    /// Draft, not yet visible.
    Pending,
    /// Open to participation requests.
    Published,
    /// Withdrawn by its organizer or an administrator.
    Canceled,
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                     | Description                                          |
// |--------------------------|------------------------------------------------------|
// | ParticipationRequest     | One user's request to join one event.                |
// | NewParticipationRequest  | A request that has not been assigned an id yet.      |
// | EventSnapshot            | Immutable read of event attributes.                  |
// | EventRequestStatusUpdate | Raw batch update input, prior to validation.         |
// | StatusUpdateResult       | Partition of a batch into confirmed and rejected.    |
//--------------------------------------------------------------------------------------------------

/// A record of one user's intent to join one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRequest {
    /// Unique identifier, assigned by the store.
    pub id: Uuid,
    /// User who made the request.
    pub requester_id: Uuid,
    /// Target event.
    pub event_id: Uuid,
    /// Creation time, millisecond precision.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: RequestStatus,
}

impl ParticipationRequest {
    /// Returns true while the organizer can still confirm or reject the request.
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// A participation request about to be inserted into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipationRequest {
    pub requester_id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
}

impl NewParticipationRequest {
    /// Builds a pending request stamped with the current time truncated to milliseconds.
    pub fn pending(requester_id: Uuid, event_id: Uuid) -> Self {
        Self {
            requester_id,
            event_id,
            created_at: Utc::now().trunc_subsecs(3),
            status: RequestStatus::Pending,
        }
    }

    /// Assigns the store-generated id.
    pub fn with_id(self, id: Uuid) -> ParticipationRequest {
        ParticipationRequest {
            id,
            requester_id: self.requester_id,
            event_id: self.event_id,
            created_at: self.created_at,
            status: self.status,
        }
    }
}

/// Point-in-time read of the event attributes admission decisions depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Identifier of the event.
    pub event_id: Uuid,
    /// User who organizes the event.
    pub organizer_id: Uuid,
    /// Whether the event is published.
    pub publication_state: PublicationState,
    /// Maximum number of confirmed participants; 0 means unlimited.
    pub participant_limit: u32,
    /// Whether the organizer must approve requests.
    pub moderation_enabled: bool,
}

impl EventSnapshot {
    pub fn is_published(&self) -> bool {
        self.publication_state == PublicationState::Published
    }

    /// Capacity is unlimited or moderation is off, so requests skip organizer approval.
    pub fn auto_confirms(&self) -> bool {
        self.participant_limit == 0 || !self.moderation_enabled
    }

    /// True when confirmations must be counted against the participant limit.
    pub fn enforces_capacity(&self) -> bool {
        !self.auto_confirms()
    }
}

/// Batch status update as submitted by an organizer, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestStatusUpdate {
    pub request_ids: Vec<Uuid>,
    pub status: String,
}

/// Outcome of a batch status update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResult {
    pub confirmed_requests: Vec<ParticipationRequest>,
    pub rejected_requests: Vec<ParticipationRequest>,
}

impl StatusUpdateResult {
    pub fn confirmed_ids(&self) -> Vec<Uuid> {
        self.confirmed_requests.iter().map(|r| r.id).collect()
    }

    pub fn rejected_ids(&self) -> Vec<Uuid> {
        self.rejected_requests.iter().map(|r| r.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(limit: u32, moderation: bool) -> EventSnapshot {
        EventSnapshot {
            event_id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            publication_state: PublicationState::Published,
            participant_limit: limit,
            moderation_enabled: moderation,
        }
    }

    #[test]
    fn test_status_target_parsing() {
        assert_eq!("CONFIRMED".parse::<StatusUpdateTarget>(), Ok(StatusUpdateTarget::Confirmed));
        assert_eq!("REJECTED".parse::<StatusUpdateTarget>(), Ok(StatusUpdateTarget::Rejected));
        assert_eq!(
            "PENDING".parse::<StatusUpdateTarget>(),
            Err(UnknownStatus("PENDING".to_string()))
        );
        // Case matters at the boundary
        assert!("confirmed".parse::<StatusUpdateTarget>().is_err());
    }

    #[test]
    fn test_auto_confirm_modes() {
        assert!(snapshot(0, true).auto_confirms());
        assert!(snapshot(10, false).auto_confirms());
        assert!(snapshot(0, false).auto_confirms());
        assert!(!snapshot(10, true).auto_confirms());
        assert!(snapshot(10, true).enforces_capacity());
    }

    #[test]
    fn test_pending_request_is_truncated_to_millis() {
        let new_request = NewParticipationRequest::pending(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(new_request.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(new_request.status, RequestStatus::Pending);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&RequestStatus::Canceled).unwrap();
        assert_eq!(json, "\"CANCELED\"");
        assert_eq!(RequestStatus::Confirmed.to_string(), "CONFIRMED");
    }
}
