//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventHandler            | Trait for event handling                         | handle_event      |
// | EventLogger             | Bounded in-memory history of events              | get_history       |
// | AuditLogHandler         | Appends events to rotating JSON-lines files      | write_event       |
//--------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

use super::event_types::{EventError, EventResult, RequestEvent};

/// Event handler trait for processing events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the types of events this handler processes
    fn event_types(&self) -> Vec<&'static str>;

    /// Processes an event
    async fn handle_event(&self, event: RequestEvent) -> EventResult<()>;
}

/// A simple in-memory event logger
pub struct EventLogger {
    /// Maximum number of events to keep in history
    max_history: usize,
    history: RwLock<VecDeque<RequestEvent>>,
}

impl EventLogger {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: RwLock::new(VecDeque::with_capacity(max_history)),
        }
    }

    /// Returns the retained events, oldest first
    pub async fn get_history(&self) -> Vec<RequestEvent> {
        self.history.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl EventHandler for EventLogger {
    fn event_types(&self) -> Vec<&'static str> {
        RequestEvent::ALL_TYPES.to_vec()
    }

    async fn handle_event(&self, event: RequestEvent) -> EventResult<()> {
        let mut history = self.history.write().await;

        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(event);

        Ok(())
    }
}

struct AuditFile {
    file: tokio::fs::File,
    events_written: usize,
}

/// Writes every audit event as one JSON line, rotating files after
/// `max_events_per_file` events.
pub struct AuditLogHandler {
    /// Directory to store audit files
    output_dir: PathBuf,
    current_file: Mutex<Option<AuditFile>>,
    max_events_per_file: usize,
    /// Distinguishes files opened within the same millisecond
    files_opened: AtomicUsize,
}

impl AuditLogHandler {
    /// Creates the handler, creating `output_dir` if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P, max_events_per_file: usize) -> std::io::Result<Self> {
        let path = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            output_dir: path,
            current_file: Mutex::new(None),
            max_events_per_file: max_events_per_file.max(1),
            files_opened: AtomicUsize::new(0),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn open_new_file(&self) -> std::io::Result<AuditFile> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let sequence = self.files_opened.fetch_add(1, Ordering::SeqCst);
        let path = self
            .output_dir
            .join(format!("requests_{}_{:04}.jsonl", timestamp, sequence));

        debug!("Opening new audit file: {:?}", path);
        let file = tokio::fs::File::create(path).await?;

        Ok(AuditFile {
            file,
            events_written: 0,
        })
    }

    async fn write_event(&self, event: &RequestEvent) -> std::io::Result<()> {
        let mut current = self.current_file.lock().await;

        let needs_rotation = current
            .as_ref()
            .is_none_or(|audit| audit.events_written >= self.max_events_per_file);
        if needs_rotation {
            *current = Some(self.open_new_file().await?);
        }

        let Some(audit) = current.as_mut() else {
            return Ok(());
        };

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        audit.file.write_all(&line).await?;
        audit.file.flush().await?;
        audit.events_written += 1;

        Ok(())
    }
}

#[async_trait]
impl EventHandler for AuditLogHandler {
    fn event_types(&self) -> Vec<&'static str> {
        RequestEvent::ALL_TYPES.to_vec()
    }

    async fn handle_event(&self, event: RequestEvent) -> EventResult<()> {
        self.write_event(&event).await.map_err(|e| {
            error!("Failed to persist audit event: {}", e);
            EventError::ProcessingError(format!("Failed to persist audit event: {}", e))
        })
    }
}
