//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the audit trail of the admission engine. Committed request
// changes are published on a broadcast bus and routed to handlers without blocking
// the admission path.
//
// | Component                | Description                                                |
// |--------------------------|------------------------------------------------------------|
// | RequestEvent             | Enum representing all audited request changes              |
// | EventBus                 | Central hub for publishing and subscribing to events       |
// | EventHandler             | Trait for components that can handle events                |
// | EventDispatcher          | Component that routes events to registered handlers        |
//--------------------------------------------------------------------------------------------------

mod dispatcher;
mod event_bus;
mod event_types;
mod handlers;

#[cfg(test)]
mod tests;

pub use dispatcher::EventDispatcher;
pub use event_bus::{DEFAULT_CAPACITY, EventBus};
pub use event_types::{EventError, EventResult, RequestEvent};
pub use handlers::{AuditLogHandler, EventHandler, EventLogger};
