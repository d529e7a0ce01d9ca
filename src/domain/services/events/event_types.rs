//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | RequestEvent            | Audit events emitted by the admission engine     | event_type        |
// | EventError              | Error types for event processing                 | error, from       |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{ParticipationRequest, RequestStatus, StatusUpdateTarget};

/// Errors that can occur in the event system
#[derive(Error, Debug, Clone)]
pub enum EventError {
    /// Failed to publish an event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to process an event
    #[error("Failed to process event: {0}")]
    ProcessingError(String),
}

/// Type alias for Result with EventError
pub type EventResult<T> = Result<T, EventError>;

/// Committed changes to participation requests.
///
/// Events are only emitted after the corresponding store write succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestEvent {
    /// A request was created, either pending or auto-confirmed
    RequestCreated {
        request: ParticipationRequest,
        timestamp: DateTime<Utc>,
    },

    /// A pending request was confirmed or rejected by a batch update
    RequestStatusChanged {
        request_id: Uuid,
        event_id: Uuid,
        previous_status: RequestStatus,
        new_status: RequestStatus,
        timestamp: DateTime<Utc>,
    },

    /// The requester canceled their request
    RequestCanceled {
        request: ParticipationRequest,
        previous_status: RequestStatus,
        timestamp: DateTime<Utc>,
    },

    /// Summary of one organizer batch
    BatchProcessed {
        event_id: Uuid,
        target: StatusUpdateTarget,
        confirmed: Vec<Uuid>,
        rejected: Vec<Uuid>,
        timestamp: DateTime<Utc>,
    },
}

impl RequestEvent {
    /// Name used to route the event to handlers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestCreated { .. } => "RequestCreated",
            Self::RequestStatusChanged { .. } => "RequestStatusChanged",
            Self::RequestCanceled { .. } => "RequestCanceled",
            Self::BatchProcessed { .. } => "BatchProcessed",
        }
    }

    /// Event the audited request belongs to.
    pub fn event_id(&self) -> Uuid {
        match self {
            Self::RequestCreated { request, .. } | Self::RequestCanceled { request, .. } => request.event_id,
            Self::RequestStatusChanged { event_id, .. } | Self::BatchProcessed { event_id, .. } => *event_id,
        }
    }

    /// Every routable event type.
    pub const ALL_TYPES: [&'static str; 4] = [
        "RequestCreated",
        "RequestStatusChanged",
        "RequestCanceled",
        "BatchProcessed",
    ];
}
