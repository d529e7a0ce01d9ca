//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Per-event mutual exclusion for the capacity critical section.
//
// Every operation that reads the confirmed count of an event and then writes
// requests for it runs while holding that event's lock. Each event id owns a
// separate mutex, so operations on different events never contend.
//
// | Component        | Description                                              |
// |------------------|----------------------------------------------------------|
// | EventLocks       | Registry mapping event ids to their async mutex          |
// | EventLockGuard   | Held for the duration of one critical section            |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;
use uuid::Uuid;

type LockTable = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

/// Keyed lock registry, one async mutex per event id.
///
/// Entries are created on first use and pruned when the last holder or waiter
/// for an event goes away, so the table only tracks events with work in flight.
#[derive(Clone, Default)]
pub struct EventLocks {
    locks: LockTable,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `event_id`.
    ///
    /// The registry mutex is only held long enough to look up the event's
    /// entry; waiting happens on the per-event mutex.
    pub async fn lock(&self, event_id: Uuid) -> EventLockGuard {
        let mutex = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry(event_id)
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let guard = mutex.lock_owned().await;
        trace!("Acquired lock for event {}", event_id);

        EventLockGuard {
            event_id,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of events currently holding or awaiting a lock.
    pub fn tracked_events(&self) -> usize {
        self.locks.lock().len()
    }
}

impl fmt::Debug for EventLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLocks")
            .field("tracked_events", &self.tracked_events())
            .finish()
    }
}

/// Exclusive access to one event. Released on drop.
pub struct EventLockGuard {
    event_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockTable,
}

impl EventLockGuard {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }
}

impl Drop for EventLockGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only sees the table and waiters
        drop(self.guard.take());

        let mut locks = self.locks.lock();
        let idle = locks
            .get(&self.event_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1);
        if idle {
            locks.remove(&self.event_id);
        }
        trace!("Released lock for event {}", self.event_id);
    }
}
