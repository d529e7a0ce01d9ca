// Expose the modules
pub mod config;
pub mod domain;

// Re-export key types for easier usage
pub use config::{Config, ConfigError};
pub use domain::models::types::{
    EventRequestStatusUpdate, EventSnapshot, NewParticipationRequest, ParticipationRequest,
    PublicationState, RequestStatus, StatusUpdateResult, StatusUpdateTarget, UnknownStatus,
};
pub use domain::services::admission::{
    AdmissionEngine, AdmissionError, AdmissionResult, AdmissionService, admit_batch,
};
pub use domain::services::collaborators::{
    CollaboratorError, EventInfoProvider, StaticEventDirectory, StaticUserDirectory,
    UserExistenceChecker,
};
pub use domain::services::enrichment::{ConfirmedCountSource, confirmed_counts_or_zero};
pub use domain::services::event_locks::{EventLockGuard, EventLocks};
pub use domain::services::events::{
    AuditLogHandler, EventBus, EventDispatcher, EventError, EventHandler, EventLogger,
    EventResult, RequestEvent,
};
pub use domain::services::request_store::{InMemoryRequestStore, RequestStore, StoreError};
