use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::types::{
    NewParticipationRequest, ParticipationRequest, RequestStatus, StatusUpdateTarget,
};
use crate::domain::services::events::{
    AuditLogHandler, EventBus, EventDispatcher, EventError, EventHandler, EventLogger,
    EventResult, RequestEvent,
};

// Helper to create a stored request
fn create_test_request() -> ParticipationRequest {
    NewParticipationRequest::pending(Uuid::new_v4(), Uuid::new_v4()).with_id(Uuid::new_v4())
}

fn created_event() -> RequestEvent {
    RequestEvent::RequestCreated {
        request: create_test_request(),
        timestamp: Utc::now(),
    }
}

fn batch_event() -> RequestEvent {
    RequestEvent::BatchProcessed {
        event_id: Uuid::new_v4(),
        target: StatusUpdateTarget::Confirmed,
        confirmed: vec![Uuid::new_v4()],
        rejected: vec![],
        timestamp: Utc::now(),
    }
}

async fn wait_for_history(logger: &EventLogger, expected: usize) -> Vec<RequestEvent> {
    for _ in 0..50 {
        let history = logger.get_history().await;
        if history.len() >= expected {
            return history;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    logger.get_history().await
}

#[tokio::test]
async fn test_event_bus_publish_subscribe() {
    let event_bus = EventBus::default();
    let mut subscriber = event_bus.subscribe();

    let event = created_event();
    event_bus.publish(event.clone()).unwrap();

    let received = subscriber.recv().await.unwrap();
    assert_eq!(received, event);
}

#[tokio::test]
async fn test_publish_without_subscribers_is_noop() {
    let event_bus = EventBus::new(4);
    assert_eq!(event_bus.subscriber_count(), 0);
    assert!(event_bus.publish(created_event()).is_ok());
    assert_eq!(event_bus.capacity(), 4);
}

#[tokio::test]
async fn test_event_logger_receives_dispatched_events_in_order() {
    let event_bus = EventBus::default();
    let logger = Arc::new(EventLogger::new(10));

    let dispatcher = EventDispatcher::new(event_bus.clone());
    dispatcher.register_handler(logger.clone()).await;
    let _handle = dispatcher.start().await;

    let first = created_event();
    let second = batch_event();
    event_bus.publish(first.clone()).unwrap();
    event_bus.publish(second.clone()).unwrap();

    let history = wait_for_history(&logger, 2).await;
    assert_eq!(history, vec![first, second]);
}

#[tokio::test]
async fn test_event_logger_history_is_bounded() {
    let logger = EventLogger::new(2);
    for _ in 0..3 {
        logger.handle_event(created_event()).await.unwrap();
    }
    let last = batch_event();
    logger.handle_event(last.clone()).await.unwrap();

    let history = logger.get_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], last);
}

struct CountingHandler {
    count: AtomicUsize,
}

#[async_trait]
impl EventHandler for CountingHandler {
    fn event_types(&self) -> Vec<&'static str> {
        vec!["BatchProcessed"]
    }

    async fn handle_event(&self, _event: RequestEvent) -> EventResult<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl EventHandler for FailingHandler {
    fn event_types(&self) -> Vec<&'static str> {
        vec!["RequestCreated"]
    }

    async fn handle_event(&self, _event: RequestEvent) -> EventResult<()> {
        Err(EventError::ProcessingError("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_dispatcher_routes_by_event_type() {
    let event_bus = EventBus::default();
    let counter = Arc::new(CountingHandler {
        count: AtomicUsize::new(0),
    });
    let logger = Arc::new(EventLogger::new(10));

    let dispatcher = EventDispatcher::new(event_bus.clone());
    dispatcher.register_handler(Arc::new(FailingHandler)).await;
    dispatcher.register_handler(counter.clone()).await;
    dispatcher.register_handler(logger.clone()).await;
    let _handle = dispatcher.start().await;

    event_bus.publish(created_event()).unwrap();
    event_bus.publish(batch_event()).unwrap();

    // A failing handler does not stop delivery to the others
    let history = wait_for_history(&logger, 2).await;
    assert_eq!(history.len(), 2);
    assert_eq!(counter.count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispatcher_stops_when_bus_dropped() {
    let event_bus = EventBus::default();
    let dispatcher = EventDispatcher::new(event_bus.clone());
    let handle = dispatcher.start().await;

    drop(event_bus);
    let finished = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(finished.is_ok());
}

#[tokio::test]
async fn test_audit_log_handler_writes_json_lines_and_rotates() {
    let dir = tempfile::tempdir().unwrap();
    let handler = AuditLogHandler::new(dir.path().join("audit"), 2).unwrap();

    let events = vec![created_event(), batch_event(), created_event()];
    for event in &events {
        handler.handle_event(event.clone()).await.unwrap();
    }

    let mut files: Vec<_> = std::fs::read_dir(handler.output_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    assert_eq!(files.len(), 2);

    let mut written = Vec::new();
    for file in files {
        for line in std::fs::read_to_string(file).unwrap().lines() {
            written.push(serde_json::from_str::<RequestEvent>(line).unwrap());
        }
    }
    assert_eq!(written, events);
}

#[test]
fn test_event_routing_names() {
    let request = create_test_request();
    let event = RequestEvent::RequestCanceled {
        request: request.clone(),
        previous_status: RequestStatus::Confirmed,
        timestamp: Utc::now(),
    };
    assert_eq!(event.event_type(), "RequestCanceled");
    assert_eq!(event.event_id(), request.event_id);
    assert!(RequestEvent::ALL_TYPES.contains(&batch_event().event_type()));
}
