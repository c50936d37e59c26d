//! Best-effort persistence of research reports.
//!
//! A store failure never changes what the caller sees: it is logged and dropped.

use ideascout_core::{DocumentStore, ResearchRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Insert `record`, logging instead of returning any failure.
pub async fn save_best_effort(store: &dyn DocumentStore, record: &ResearchRecord) {
    match store.insert(record).await {
        Ok(()) => debug!(store = store.name(), idea = %record.idea, "research saved"),
        Err(e) => warn!(store = store.name(), error = %e, "failed to save research"),
    }
}

/// Fire-and-forget [`save_best_effort`] on the runtime.
pub fn spawn_save(
    store: Arc<dyn DocumentStore>,
    record: ResearchRecord,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { save_best_effort(store.as_ref(), &record).await })
}
