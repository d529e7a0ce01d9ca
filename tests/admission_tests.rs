//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests for the admission engine through its public API.
// They exercise the capacity and uniqueness guarantees under real concurrency
// on a multi-threaded runtime, plus end-to-end scenarios with the audit trail.
//--------------------------------------------------------------------------------------------------

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use uuid::Uuid;

use participation_admission::{
    AdmissionEngine, AdmissionError, AdmissionService, AuditLogHandler, EventBus, EventDispatcher,
    EventLogger, EventSnapshot, InMemoryRequestStore, PublicationState, RequestEvent, RequestStatus,
    RequestStore, StaticEventDirectory, StaticUserDirectory, StatusUpdateTarget,
};

struct TestSystem {
    engine: Arc<AdmissionEngine>,
    store: Arc<InMemoryRequestStore>,
    events: Arc<StaticEventDirectory>,
    users: Arc<StaticUserDirectory>,
    organizer: Uuid,
}

/// Sets up an engine over in-memory storage and directories.
fn setup(event_bus: Option<EventBus>) -> TestSystem {
    let store = Arc::new(InMemoryRequestStore::new());
    let events = Arc::new(StaticEventDirectory::new());
    let users = Arc::new(StaticUserDirectory::new());
    let organizer = Uuid::new_v4();
    users.register(organizer);

    let mut engine = AdmissionEngine::new(store.clone(), events.clone(), users.clone());
    if let Some(bus) = event_bus {
        engine = engine.with_event_bus(bus);
    }

    TestSystem {
        engine: Arc::new(engine),
        store,
        events,
        users,
        organizer,
    }
}

impl TestSystem {
    fn publish_event(&self, participant_limit: u32, moderation_enabled: bool) -> Uuid {
        let event_id = Uuid::new_v4();
        self.events.upsert(EventSnapshot {
            event_id,
            organizer_id: self.organizer,
            publication_state: PublicationState::Published,
            participant_limit,
            moderation_enabled,
        });
        event_id
    }

    fn users(&self, count: usize) -> Vec<Uuid> {
        (0..count)
            .map(|_| {
                let id = Uuid::new_v4();
                self.users.register(id);
                id
            })
            .collect()
    }

    async fn confirmed(&self, event_id: Uuid) -> usize {
        self.store
            .count_by_event_and_status(event_id, RequestStatus::Confirmed)
            .await
            .unwrap()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_creates_never_exceed_limit() {
    let system = setup(None);
    let event_id = system.publish_event(7, false);

    let attempts = system.users(200).into_iter().map(|user_id| {
        let engine = Arc::clone(&system.engine);
        tokio::spawn(async move { engine.create_request(user_id, event_id).await })
    });

    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(admitted, 7);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(err, AdmissionError::ConditionNotMet(_))));
    assert_eq!(system.confirmed(event_id).await, 7);
    assert_eq!(system.engine.event_locks().tracked_events(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_duplicates_create_one_request() {
    let system = setup(None);
    let event_id = system.publish_event(0, true);
    let user_id = system.users(1)[0];

    let attempts = (0..50).map(|_| {
        let engine = Arc::clone(&system.engine);
        tokio::spawn(async move { engine.create_request(user_id, event_id).await })
    });

    let created = join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();

    assert_eq!(created, 1);
    assert_eq!(system.engine.get_user_requests(user_id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_batch_confirm_racing_creates_respects_limit() {
    let system = setup(None);
    let limit = 10;
    let event_id = system.publish_event(limit, true);

    let mut pending = Vec::new();
    for user_id in system.users(15) {
        pending.push(system.engine.create_request(user_id, event_id).await.unwrap().id);
    }

    // Two organizer batches race each other and a wave of new requests
    let first_half = pending[..8].to_vec();
    let second_half = pending[8..].to_vec();
    let mut tasks = Vec::new();
    for batch in [first_half, second_half] {
        let engine = Arc::clone(&system.engine);
        let organizer = system.organizer;
        tasks.push(tokio::spawn(async move {
            let _ = engine
                .update_request_statuses(organizer, event_id, StatusUpdateTarget::Confirmed, batch)
                .await;
        }));
    }
    for user_id in system.users(30) {
        let engine = Arc::clone(&system.engine);
        tasks.push(tokio::spawn(async move {
            let _ = engine.create_request(user_id, event_id).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(system.confirmed(event_id).await, limit as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_events_all_fill_up() {
    let system = setup(None);
    let event_ids: Vec<Uuid> = (0..20).map(|_| system.publish_event(3, false)).collect();

    let mut tasks = Vec::new();
    for event_id in &event_ids {
        for user_id in system.users(5) {
            let engine = Arc::clone(&system.engine);
            let event_id = *event_id;
            tasks.push(tokio::spawn(async move { engine.create_request(user_id, event_id).await }));
        }
    }
    join_all(tasks).await;

    let ids: HashSet<Uuid> = event_ids.iter().copied().collect();
    let counts = system.engine.get_confirmed_requests(&ids).await.unwrap();
    assert_eq!(counts.len(), 20);
    assert!(counts.values().all(|count| *count == 3));
}

#[tokio::test]
async fn test_limited_event_end_to_end() {
    let system = setup(None);
    let e1 = system.publish_event(1, true);
    let users = system.users(2);

    let request = system.engine.create_request(users[0], e1).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let result = system
        .engine
        .update_request_statuses(system.organizer, e1, StatusUpdateTarget::Confirmed, vec![request.id])
        .await
        .unwrap();
    assert_eq!(result.confirmed_ids(), vec![request.id]);
    assert!(result.rejected_requests.is_empty());

    let counts = system
        .engine
        .get_confirmed_requests(&HashSet::from([e1]))
        .await
        .unwrap();
    assert_eq!(counts.get(&e1), Some(&1));

    let err = system.engine.create_request(users[1], e1).await.unwrap_err();
    assert!(matches!(err, AdmissionError::ConditionNotMet(_)));
}

#[test]
fn test_unlimited_event_confirms_without_organizer() {
    tokio_test::block_on(async {
        let system = setup(None);
        let e2 = system.publish_event(0, true);
        let user = system.users(1)[0];

        let request = system.engine.create_request(user, e2).await.unwrap();
        assert_eq!(request.status, RequestStatus::Confirmed);

        let listed = system
            .engine
            .get_requests_for_event(e2, system.organizer)
            .await
            .unwrap();
        assert_eq!(listed, vec![request]);
    });
}

#[tokio::test]
async fn test_audit_trail_is_dispatched_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let event_bus = EventBus::new(64);
    let logger = Arc::new(EventLogger::new(100));

    let dispatcher = EventDispatcher::new(event_bus.clone());
    dispatcher.register_handler(logger.clone()).await;
    dispatcher
        .register_handler(Arc::new(AuditLogHandler::new(dir.path(), 100).unwrap()))
        .await;
    let handle = dispatcher.start().await;

    let system = setup(Some(event_bus.clone()));
    let event_id = system.publish_event(1, true);
    let users = system.users(2);
    let a = system.engine.create_request(users[0], event_id).await.unwrap();
    let b = system.engine.create_request(users[1], event_id).await.unwrap();
    system
        .engine
        .update_request_statuses(system.organizer, event_id, StatusUpdateTarget::Confirmed, vec![b.id, a.id])
        .await
        .unwrap();

    // Dropping every sender lets the dispatcher drain and stop
    drop(system);
    drop(event_bus);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    let history = logger.get_history().await;
    assert_eq!(history.len(), 5);
    match history.last() {
        Some(RequestEvent::BatchProcessed { confirmed, rejected, .. }) => {
            assert_eq!(confirmed, &vec![b.id]);
            assert_eq!(rejected, &vec![a.id]);
        }
        other => panic!("unexpected last event: {:?}", other),
    }

    let lines: usize = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap().lines().count())
        .sum();
    assert_eq!(lines, 5);
}
