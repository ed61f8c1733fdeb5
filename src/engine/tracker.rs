use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::error::TrackError;
use crate::models::location::LocationUpdate;
use crate::observability::metrics::Metrics;
use crate::stores::{AssignmentStore, PositionStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Stopped,
    Starting,
    Active,
}

struct TrackerInner {
    state: TrackerState,
    task: Option<JoinHandle<()>>,
}

/// Owns at most one live subscription against the assignment store.
/// Validates incoming samples and fans out normalized updates; invalid or
/// stale samples are dropped without a state transition.
pub struct LiveLocationTracker {
    assignments: Arc<dyn AssignmentStore>,
    updates_tx: broadcast::Sender<LocationUpdate>,
    metrics: Metrics,
    inner: Mutex<TrackerInner>,
}

impl LiveLocationTracker {
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        metrics: Metrics,
        buffer_size: usize,
    ) -> Self {
        let (updates_tx, _unused_rx) = broadcast::channel(buffer_size);

        Self {
            assignments,
            updates_tx,
            metrics,
            inner: Mutex::new(TrackerInner {
                state: TrackerState::Stopped,
                task: None,
            }),
        }
    }

    /// Open a subscription for `tracking_id`, tearing down any previous one
    /// first. Only one subscription is ever active per tracker.
    pub async fn start(&self, tracking_id: &str) -> Result<(), TrackError> {
        self.stop();

        {
            let mut inner = self.inner.lock().expect("tracker state lock");
            inner.state = TrackerState::Starting;
        }

        let stream = match self.assignments.watch_by_tracking_id(tracking_id).await {
            Ok(stream) => stream,
            Err(err) => {
                let mut inner = self.inner.lock().expect("tracker state lock");
                inner.state = TrackerState::Stopped;
                return Err(err.into());
            }
        };

        let task = tokio::spawn(run_subscription(
            tracking_id.to_string(),
            stream,
            self.updates_tx.clone(),
            self.metrics.clone(),
        ));

        let mut inner = self.inner.lock().expect("tracker state lock");
        inner.task = Some(task);
        inner.state = TrackerState::Active;
        self.metrics.live_trackers_active.inc();
        info!(tracking_id, "live tracker started");

        Ok(())
    }

    /// Cancel the subscription. Safe to call repeatedly and from cleanup
    /// paths; a stopped tracker stays stopped.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().expect("tracker state lock");
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        if inner.state == TrackerState::Active {
            self.metrics.live_trackers_active.dec();
            info!("live tracker stopped");
        }
        inner.state = TrackerState::Stopped;
    }

    pub fn state(&self) -> TrackerState {
        self.inner.lock().expect("tracker state lock").state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LocationUpdate> {
        self.updates_tx.subscribe()
    }
}

impl Drop for LiveLocationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_subscription(
    tracking_id: String,
    mut stream: PositionStream,
    updates_tx: broadcast::Sender<LocationUpdate>,
    metrics: Metrics,
) {
    let mut last_applied_ms: Option<i64> = None;

    while let Some(position) = stream.next().await {
        let point = position.point();
        if !point.is_valid() {
            metrics
                .location_updates_total
                .with_label_values(&["dropped_invalid"])
                .inc();
            warn!(
                %tracking_id,
                lat = position.lat,
                lng = position.lng,
                "dropping invalid location sample"
            );
            continue;
        }

        // Samples may arrive out of order; the embedded timestamp decides.
        let recorded_ms = position.recorded_at.timestamp_millis();
        if last_applied_ms.is_some_and(|last| recorded_ms <= last) {
            metrics
                .location_updates_total
                .with_label_values(&["dropped_stale"])
                .inc();
            debug!(%tracking_id, recorded_ms, "dropping stale location sample");
            continue;
        }
        last_applied_ms = Some(recorded_ms);

        metrics
            .location_updates_total
            .with_label_values(&["accepted"])
            .inc();

        let _ = updates_tx.send(LocationUpdate {
            tracking_id: tracking_id.clone(),
            point,
            location_description: position.location_description,
            recorded_at: position.recorded_at,
        });
    }

    debug!(%tracking_id, "position subscription ended");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use tokio::time::sleep;

    use super::{LiveLocationTracker, TrackerState};
    use crate::models::location::CourierPosition;
    use crate::observability::metrics::Metrics;
    use crate::stores::memory::MemoryAssignmentStore;

    fn position(lat: f64, lng: f64, minute: u32) -> CourierPosition {
        CourierPosition {
            lat,
            lng,
            location_description: None,
            recorded_at: Utc.with_ymd_and_hms(2024, 1, 2, 10, minute, 0).unwrap(),
            accuracy_m: None,
        }
    }

    fn tracker_with_store() -> (LiveLocationTracker, Arc<MemoryAssignmentStore>) {
        let store = Arc::new(MemoryAssignmentStore::new(16));
        let tracker = LiveLocationTracker::new(store.clone(), Metrics::new(), 16);
        (tracker, store)
    }

    #[tokio::test]
    async fn valid_sample_is_forwarded_exactly_once() {
        let (tracker, store) = tracker_with_store();
        tracker.start("TRK-1").await.unwrap();
        let mut rx = tracker.subscribe();

        store.publish("TRK-1", position(3.14, 101.69, 0));
        let update = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("update within timeout")
            .unwrap();

        assert_eq!(update.tracking_id, "TRK-1");
        assert_eq!(update.point.lat, 3.14);

        sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_sample_is_dropped() {
        let (tracker, store) = tracker_with_store();
        tracker.start("TRK-1").await.unwrap();
        let mut rx = tracker.subscribe();

        store.publish("TRK-1", position(95.0, 101.6, 0));
        store.publish("TRK-1", position(f64::NAN, 10.0, 1));
        store.publish("TRK-1", position(3.14, 101.69, 2));

        let update = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("only the valid sample arrives")
            .unwrap();
        assert_eq!(update.point.lat, 3.14);
        assert_eq!(tracker.state(), TrackerState::Active);
    }

    #[tokio::test]
    async fn stale_sample_is_dropped() {
        let (tracker, store) = tracker_with_store();
        tracker.start("TRK-1").await.unwrap();
        let mut rx = tracker.subscribe();

        store.publish("TRK-1", position(3.14, 101.69, 10));
        store.publish("TRK-1", position(3.20, 101.70, 5)); // older timestamp
        store.publish("TRK-1", position(3.25, 101.71, 12));

        let first = rx.recv().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("second accepted sample")
            .unwrap();

        assert_eq!(first.point.lat, 3.14);
        assert_eq!(second.point.lat, 3.25);
    }

    #[tokio::test]
    async fn restart_replaces_the_previous_subscription() {
        let (tracker, store) = tracker_with_store();
        tracker.start("TRK-OLD").await.unwrap();
        tracker.start("TRK-NEW").await.unwrap();
        let mut rx = tracker.subscribe();

        sleep(Duration::from_millis(50)).await;
        store.publish("TRK-OLD", position(1.0, 1.0, 0));
        store.publish("TRK-NEW", position(3.14, 101.69, 1));

        let update = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("update from the new subscription")
            .unwrap();
        assert_eq!(update.tracking_id, "TRK-NEW");
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (tracker, _store) = tracker_with_store();
        tracker.start("TRK-1").await.unwrap();
        assert_eq!(tracker.state(), TrackerState::Active);

        tracker.stop();
        tracker.stop();
        assert_eq!(tracker.state(), TrackerState::Stopped);
    }
}
