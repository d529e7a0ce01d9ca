//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Read-side enrichment of event listings with confirmed participant counts.
//
// Unlike admission decisions, this path tolerates an unavailable count source:
// listings proceed with a count of zero instead of failing.
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::domain::services::admission::AdmissionResult;

/// Source of aggregated confirmed request counts.
#[async_trait]
pub trait ConfirmedCountSource: Send + Sync {
    /// Counts per event. Events without confirmed requests may be absent.
    async fn confirmed_counts(&self, event_ids: &HashSet<Uuid>) -> AdmissionResult<HashMap<Uuid, usize>>;
}

/// Returns a confirmed count for every id in `event_ids`.
///
/// Ids missing from the source's answer count as zero. If the source fails,
/// the failure is logged and every id gets zero.
pub async fn confirmed_counts_or_zero(
    source: &dyn ConfirmedCountSource,
    event_ids: &HashSet<Uuid>,
) -> HashMap<Uuid, usize> {
    let counts = match source.confirmed_counts(event_ids).await {
        Ok(counts) => counts,
        Err(e) => {
            warn!("Confirmed counts unavailable, using 0 for {} events: {}", event_ids.len(), e);
            HashMap::new()
        }
    };

    event_ids
        .iter()
        .map(|id| (*id, counts.get(id).copied().unwrap_or(0)))
        .collect()
}

#[cfg(test)]
use mockall::*;

#[cfg(test)]
mock! {
    pub ConfirmedCountSource {}

    #[async_trait]
    impl ConfirmedCountSource for ConfirmedCountSource {
        async fn confirmed_counts(&self, event_ids: &HashSet<Uuid>) -> AdmissionResult<HashMap<Uuid, usize>>;
    }
}
