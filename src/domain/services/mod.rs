pub mod admission;
pub mod collaborators;
pub mod enrichment;
pub mod event_locks;
pub mod events;
pub mod request_store;
