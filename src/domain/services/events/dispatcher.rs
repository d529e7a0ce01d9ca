//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventDispatcher         | Routes events to registered handlers             | register, start   |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::event_bus::EventBus;
use super::handlers::EventHandler;

/// Dispatches events to registered handlers
pub struct EventDispatcher {
    /// Event bus for receiving events
    event_bus: EventBus,
    /// Map of event types to handlers
    handlers: Arc<RwLock<HashMap<&'static str, Vec<Arc<dyn EventHandler>>>>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_bus", &self.event_bus)
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    /// Creates a new event dispatcher bound to `event_bus`.
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a handler for the event types it declares.
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;

        for event_type in handler.event_types() {
            handlers
                .entry(event_type)
                .or_insert_with(Vec::new)
                .push(Arc::clone(&handler));
        }

        debug!("Registered handler for event types: {:?}", handler.event_types());
    }

    /// Starts routing events in the background.
    ///
    /// The subscription is taken before this returns, so every event published
    /// afterwards is seen. Handlers for one event run in order, which keeps
    /// each handler's view of the audit trail in publication order. The task
    /// ends once every `EventBus` clone has been dropped.
    pub async fn start(self) -> tokio::task::JoinHandle<()> {
        let handlers = Arc::clone(&self.handlers);
        let mut receiver = self.event_bus.subscribe();
        drop(self.event_bus);

        tokio::spawn(async move {
            info!("Event dispatcher started");

            loop {
                let event = match receiver.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event dispatcher lagged, {} audit events dropped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let event_type = event.event_type();
                let handlers_lock = handlers.read().await;
                match handlers_lock.get(event_type) {
                    Some(event_handlers) => {
                        for handler in event_handlers {
                            if let Err(e) = handler.handle_event(event.clone()).await {
                                error!("Handler failed to process event: {}", e);
                            }
                        }
                    }
                    None => debug!("No handlers registered for event type: {}", event_type),
                }
            }

            info!("Event dispatcher stopped");
        })
    }
}
