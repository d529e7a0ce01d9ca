//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the audit event bus using tokio's broadcast channel.
// The admission engine publishes committed request changes; handlers subscribe
// through the dispatcher.
//
// | Component     | Description                                                 |
// |---------------|-------------------------------------------------------------|
// | EventBus      | Central event bus for publishing and subscribing to events  |
//--------------------------------------------------------------------------------------------------

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::event_types::{EventError, EventResult, RequestEvent};

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Central event bus for publishing and subscribing to request events.
///
/// Events are delivered to every active subscriber. A slow subscriber that
/// falls more than `capacity` events behind loses the oldest ones.
///
/// # Examples
///
/// ```
/// use participation_admission::domain::services::events::EventBus;
///
/// let event_bus = EventBus::new(16);
/// let _subscriber = event_bus.subscribe();
/// assert_eq!(event_bus.subscriber_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Channel for broadcasting events to all subscribers
    sender: broadcast::Sender<RequestEvent>,
    /// Capacity of the event channel
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a new event bus with the specified capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The maximum number of events that can be queued before
    ///   older events are dropped. Must be greater than zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        info!("Created new EventBus with capacity: {}", capacity);
        Self { sender, capacity }
    }

    /// Publishes an event to all subscribers.
    ///
    /// If there are no subscribers, the event is simply dropped and
    /// the method returns successfully.
    pub fn publish(&self, event: RequestEvent) -> EventResult<()> {
        if self.sender.receiver_count() == 0 {
            debug!("No subscribers for event: {}", event.event_type());
            return Ok(());
        }

        debug!("Publishing event: {:?}", event);
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to publish event: {}", e);
                Err(EventError::PublishError(e.to_string()))
            }
        }
    }

    /// Creates a new subscription to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        debug!(
            "New subscriber added to EventBus (total: {})",
            self.sender.receiver_count() + 1
        );
        self.sender.subscribe()
    }

    /// Returns the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the capacity of the event channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
