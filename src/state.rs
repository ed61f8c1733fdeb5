use std::sync::Arc;

use crate::engine::session::TrackingSession;
use crate::observability::metrics::Metrics;
use crate::providers::{Geocoder, RoutePlanner};
use crate::stores::memory::{MemoryAssignmentStore, MemoryEventLog, MemoryParcelStore};

pub struct AppState {
    pub parcels: Arc<MemoryParcelStore>,
    pub event_log: Arc<MemoryEventLog>,
    pub assignments: Arc<MemoryAssignmentStore>,
    pub session: TrackingSession,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn RoutePlanner>,
        event_buffer_size: usize,
    ) -> Self {
        let parcels = Arc::new(MemoryParcelStore::new());
        let event_log = Arc::new(MemoryEventLog::new());
        let assignments = Arc::new(MemoryAssignmentStore::new(event_buffer_size));
        let metrics = Metrics::new();

        let session = TrackingSession::new(
            parcels.clone(),
            event_log.clone(),
            assignments.clone(),
            geocoder,
            router,
            metrics.clone(),
            event_buffer_size,
        );

        Self {
            parcels,
            event_log,
            assignments,
            session,
            metrics,
        }
    }
}
