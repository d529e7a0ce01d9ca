//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entry point for the participation admission engine.
// It sets up the audit event system, wires the engine to in-process event and
// user directories, and optionally runs a demonstration.
//--------------------------------------------------------------------------------------------------
// To run the demo: cargo run -- --demo
// Bigger race: cargo run -- --demo --participants 500 --capacity 40
// Persist the audit trail: cargo run -- --demo --audit-dir ./audit --log-level debug
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use futures::future::join_all;
use tracing::{Level, error, info, warn};
use uuid::Uuid;

use participation_admission::{
    AdmissionEngine, AdmissionService, AuditLogHandler, Config, EventBus, EventDispatcher,
    EventHandler, EventLogger, EventResult, EventSnapshot, InMemoryRequestStore, PublicationState,
    RequestEvent, StaticEventDirectory, StaticUserDirectory, StatusUpdateTarget,
};

/// Console handler that reports committed admission changes
struct AdmissionConsoleHandler;

#[async_trait]
impl EventHandler for AdmissionConsoleHandler {
    fn event_types(&self) -> Vec<&'static str> {
        vec!["RequestCreated", "RequestCanceled", "BatchProcessed"]
    }

    async fn handle_event(&self, event: RequestEvent) -> EventResult<()> {
        match &event {
            RequestEvent::RequestCreated { request, timestamp } => {
                info!(
                    "REQUEST CREATED [{}]: {} by {} for event {} ({})",
                    timestamp, request.id, request.requester_id, request.event_id, request.status
                );
            }
            RequestEvent::RequestCanceled { request, previous_status, timestamp } => {
                info!(
                    "REQUEST CANCELED [{}]: {} (was {})",
                    timestamp, request.id, previous_status
                );
            }
            RequestEvent::BatchProcessed { event_id, target, confirmed, rejected, timestamp } => {
                info!(
                    "BATCH {:?} [{}]: event {} confirmed {}, rejected {}",
                    target,
                    timestamp,
                    event_id,
                    confirmed.len(),
                    rejected.len()
                );
            }
            RequestEvent::RequestStatusChanged { .. } => {}
        }
        Ok(())
    }
}

/// CLI options for the application
#[derive(Parser, Debug)]
#[command(author, version, about = "Participation request admission engine")]
struct Opt {
    /// Run the demonstration scenarios
    #[arg(long)]
    demo: bool,

    /// Users racing for seats in the demo
    #[arg(long, default_value = "100")]
    participants: usize,

    /// Participant limit of the raced event
    #[arg(long, default_value = "10")]
    capacity: u32,

    /// Directory for the JSON-lines audit trail (overrides AUDIT_LOG_DIR)
    #[arg(long)]
    audit_dir: Option<PathBuf>,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: Level,
}

struct Demo {
    engine: Arc<AdmissionEngine>,
    events: Arc<StaticEventDirectory>,
    users: Arc<StaticUserDirectory>,
    organizer: Uuid,
}

impl Demo {
    fn new(event_bus: EventBus) -> Self {
        let store = Arc::new(InMemoryRequestStore::new());
        let events = Arc::new(StaticEventDirectory::new());
        let users = Arc::new(StaticUserDirectory::new());
        let organizer = Uuid::new_v4();
        users.register(organizer);

        let engine = AdmissionEngine::new(store, events.clone(), users.clone()).with_event_bus(event_bus);

        Self {
            engine: Arc::new(engine),
            events,
            users,
            organizer,
        }
    }

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

    fn new_user(&self) -> Uuid {
        let user_id = Uuid::new_v4();
        self.users.register(user_id);
        user_id
    }

    /// Moderated event with a single seat.
    async fn limited_event(&self) -> anyhow::Result<()> {
        let event_id = self.publish_event(1, true);
        info!("Limited event {} (limit 1, moderated)", event_id);

        let first = self.engine.create_request(self.new_user(), event_id).await?;
        info!("First request is {}", first.status);

        let result = self
            .engine
            .update_request_statuses(self.organizer, event_id, StatusUpdateTarget::Confirmed, vec![first.id])
            .await?;
        info!("Organizer confirmed {} request(s)", result.confirmed_requests.len());

        match self.engine.create_request(self.new_user(), event_id).await {
            Ok(request) => warn!("Unexpected admission of request {}", request.id),
            Err(e) => info!("Second user turned away: {}", e),
        }
        Ok(())
    }

    /// Event without a participant limit.
    async fn open_event(&self) -> anyhow::Result<()> {
        let event_id = self.publish_event(0, true);
        let request = self.engine.create_request(self.new_user(), event_id).await?;
        info!("Open event {}: request is {} without organizer action", event_id, request.status);
        Ok(())
    }

    /// Many users request a seat at once on an unmoderated event.
    async fn race(&self, participants: usize, capacity: u32) -> anyhow::Result<()> {
        let event_id = self.publish_event(capacity, false);
        info!(
            "Racing {} users for {} seats on event {}",
            participants, capacity, event_id
        );

        let attempts = (0..participants).map(|_| {
            let engine = Arc::clone(&self.engine);
            let user_id = self.new_user();
            tokio::spawn(async move { engine.create_request(user_id, event_id).await })
        });

        let mut admitted = 0;
        let mut turned_away = 0;
        for outcome in join_all(attempts).await {
            match outcome.context("request task panicked")? {
                Ok(_) => admitted += 1,
                Err(_) => turned_away += 1,
            }
        }

        let counts = self
            .engine
            .get_confirmed_requests(&[event_id].into_iter().collect())
            .await?;
        info!(
            "Race finished: {} admitted, {} turned away, {} confirmed in store",
            admitted,
            turned_away,
            counts.get(&event_id).copied().unwrap_or(0)
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let opt = Opt::parse();

    // Initialize logging
    tracing_subscriber::fmt().with_max_level(opt.log_level).init();

    let config = Config::try_from_env()?;
    info!("Starting {}", config.app_id);

    // Set up the event system
    let event_bus = EventBus::new(config.event_bus_capacity);
    let dispatcher = EventDispatcher::new(event_bus.clone());
    dispatcher
        .register_handler(Arc::new(EventLogger::new(config.event_bus_capacity)))
        .await;
    dispatcher.register_handler(Arc::new(AdmissionConsoleHandler)).await;

    if let Some(dir) = opt.audit_dir.clone().or(config.audit_log_dir.clone()) {
        match AuditLogHandler::new(&dir, config.audit_events_per_file) {
            Ok(handler) => {
                info!("Audit trail will be written to {}", dir.display());
                dispatcher.register_handler(Arc::new(handler)).await;
            }
            Err(e) => error!("Failed to create audit log handler: {}", e),
        }
    }

    let dispatcher_handle = dispatcher.start().await;

    if opt.demo {
        let demo = Demo::new(event_bus.clone());
        demo.limited_event().await?;
        demo.open_event().await?;
        demo.race(opt.participants, opt.capacity).await?;
        info!("Demo completed");
    } else {
        info!("No actions specified. Use --demo to run the demonstration.");
    }

    // Let the dispatcher drain what was published, then stop it
    drop(event_bus);
    if tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
        .await
        .is_err()
    {
        warn!("Event dispatcher did not finish draining in time");
    }

    Ok(())
}
