use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::eta::estimate;
use crate::engine::timeline::build_timeline;
use crate::engine::tracker::{LiveLocationTracker, TrackerState};
use crate::error::TrackError;
use crate::geo::{haversine_km, offset_point};
use crate::models::eta::EstimatedDelivery;
use crate::models::event::TrackingEvent;
use crate::models::location::{GeoPoint, LocationUpdate, MapCoordinates};
use crate::models::parcel::{Parcel, ParcelStatus};
use crate::observability::metrics::Metrics;
use crate::providers::{Geocoder, RouteOutcome, RoutePlanner};
use crate::stores::{AssignmentStore, EventLogStore, ParcelStore};

// Kuala Lumpur city center; last-resort origin when no courier position
// exists and no event location geocodes.
const DEFAULT_ORIGIN: GeoPoint = GeoPoint {
    lat: 3.1390,
    lng: 101.6869,
};

// Destination fallback lands ~5 km from the current point so the map always
// has two distinct pins.
const DESTINATION_FALLBACK_OFFSET_DEG: f64 = 0.045;

/// Everything one lookup resolves.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSnapshot {
    pub parcel: Parcel,
    pub timeline: Vec<TrackingEvent>,
    pub map: MapCoordinates,
    pub eta: Option<EstimatedDelivery>,
    pub route: RouteOutcome,
    pub distance_km: f64,
    pub last_updated: DateTime<Utc>,
}

/// Pushed to live consumers whenever an accepted courier update lands.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub tracking_id: String,
    pub map: MapCoordinates,
    pub route: RouteOutcome,
    pub last_updated: DateTime<Utc>,
}

/// Orchestrates one tracking view: timeline, coordinates, route, ETA, and
/// the live tracker. A new lookup fully supersedes the previous one; the
/// generation token keeps a superseded lookup's async results from being
/// applied.
pub struct TrackingSession {
    inner: Arc<Inner>,
}

struct Inner {
    parcels: Arc<dyn ParcelStore>,
    event_log: Arc<dyn EventLogStore>,
    assignments: Arc<dyn AssignmentStore>,
    geocoder: Arc<dyn Geocoder>,
    router: Arc<dyn RoutePlanner>,
    metrics: Metrics,
    tracker: LiveLocationTracker,
    generation: AtomicU64,
    map: RwLock<Option<MapCoordinates>>,
    live_task: Mutex<Option<JoinHandle<()>>>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl TrackingSession {
    pub fn new(
        parcels: Arc<dyn ParcelStore>,
        event_log: Arc<dyn EventLogStore>,
        assignments: Arc<dyn AssignmentStore>,
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn RoutePlanner>,
        metrics: Metrics,
        event_buffer_size: usize,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let tracker =
            LiveLocationTracker::new(assignments.clone(), metrics.clone(), event_buffer_size);

        Self {
            inner: Arc::new(Inner {
                parcels,
                event_log,
                assignments,
                geocoder,
                router,
                metrics,
                tracker,
                generation: AtomicU64::new(0),
                map: RwLock::new(None),
                live_task: Mutex::new(None),
                events_tx,
            }),
        }
    }

    pub async fn lookup(&self, raw_id: &str) -> Result<TrackingSnapshot, TrackError> {
        let start = Instant::now();
        let result = self.lookup_inner(raw_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(TrackError::NotFound(_)) => "not_found",
            Err(TrackError::Validation(_)) => "invalid",
            Err(_) => "error",
        };
        self.inner
            .metrics
            .lookup_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        self.inner
            .metrics
            .lookups_total
            .with_label_values(&[outcome])
            .inc();

        result
    }

    async fn lookup_inner(&self, raw_id: &str) -> Result<TrackingSnapshot, TrackError> {
        let tracking_id = raw_id.trim();
        if tracking_id.is_empty() {
            return Err(TrackError::Validation(
                "tracking id must not be empty".to_string(),
            ));
        }

        let inner = &self.inner;

        // Tear down the superseded lookup before any I/O.
        let generation = inner.begin_generation();

        let parcel = inner
            .parcels
            .get_by_tracking_id(tracking_id)
            .await?
            .ok_or_else(|| TrackError::NotFound(format!("no parcel for {tracking_id}")))?;

        let log_entries = match inner.event_log.query_by_tracking_id(tracking_id).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    tracking_id,
                    error = %err,
                    "event log read failed; timeline from parcel record only"
                );
                Vec::new()
            }
        };
        let timeline = build_timeline(&parcel, log_entries);

        let (current, current_description) = inner.resolve_current(&parcel, &timeline).await;
        let destination = inner.resolve_destination(&parcel, &current).await;

        let distance_km = haversine_km(&current, &destination);
        let eta = estimate(&parcel, Some(distance_km), Utc::now());
        let route = inner.resolve_route(&current, &destination).await;

        let map = MapCoordinates {
            current,
            destination,
            current_description,
            route_distance_km: route.distance_km(),
        };
        inner.apply_map(generation, map.clone());

        if parcel.status.is_moving() {
            self.start_live_updates(generation, tracking_id, destination)
                .await;
        }

        info!(
            tracking_id,
            status = parcel.status.as_str(),
            distance_km,
            events = timeline.len(),
            "lookup resolved"
        );

        Ok(TrackingSnapshot {
            parcel,
            timeline,
            map,
            eta,
            route,
            distance_km,
            last_updated: Utc::now(),
        })
    }

    async fn start_live_updates(&self, generation: u64, tracking_id: &str, destination: GeoPoint) {
        let inner = &self.inner;

        if inner.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        if let Err(err) = inner.tracker.start(tracking_id).await {
            warn!(tracking_id, error = %err, "live tracking unavailable");
            return;
        }

        // A lookup racing in while the subscription opened wins; yield to it.
        if inner.generation.load(Ordering::SeqCst) != generation {
            inner.tracker.stop();
            return;
        }

        let mut updates = inner.tracker.subscribe();
        let session = Arc::clone(inner);
        let tracking_id = tracking_id.to_string();

        let task = tokio::spawn(async move {
            loop {
                let update = match updates.recv().await {
                    Ok(update) => update,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%tracking_id, skipped, "live update consumer lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if session.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                session
                    .apply_live_update(generation, &tracking_id, update, destination)
                    .await;
            }
        });

        *inner.live_task.lock().expect("live task lock") = Some(task);
    }

    pub fn map_coordinates(&self) -> Option<MapCoordinates> {
        self.inner.map.read().expect("map state lock").clone()
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.inner.tracker.state()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }
}

impl Inner {
    /// Invalidate the previous lookup: bump the generation, stop live
    /// tracking, drop the forwarding task, clear map state.
    fn begin_generation(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.tracker.stop();
        if let Some(task) = self.live_task.lock().expect("live task lock").take() {
            task.abort();
        }
        *self.map.write().expect("map state lock") = None;

        generation
    }

    async fn resolve_current(
        &self,
        parcel: &Parcel,
        timeline: &[TrackingEvent],
    ) -> (GeoPoint, Option<String>) {
        // A courier en route reports real coordinates; prefer those.
        if parcel.status == ParcelStatus::OutForDelivery {
            match self.assignments.latest_by_tracking_id(&parcel.tracking_id).await {
                Ok(Some(position)) if position.point().is_valid() => {
                    let point = position.point();
                    let description = match position.location_description {
                        Some(text) => Some(text),
                        None => self.reverse_description(&point).await,
                    };
                    return (point, description);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "assignment store read failed during lookup")
                }
            }
        }

        // Timeline is newest-first; take the freshest event that names a place.
        if let Some(location) = timeline.iter().find_map(|event| event.location.clone()) {
            match self.geocoder.forward(&location).await {
                Ok(Some(place)) => {
                    self.count_provider("geocode", "ok");
                    return (place.point, Some(place.formatted_address));
                }
                Ok(None) => {
                    self.count_provider("geocode", "miss");
                    debug!(%location, "no geocoding match for event location");
                }
                Err(err) => {
                    self.count_provider("geocode", "error");
                    warn!(%location, error = %err, "forward geocoding failed");
                }
            }
        }

        (DEFAULT_ORIGIN, None)
    }

    async fn resolve_destination(&self, parcel: &Parcel, current: &GeoPoint) -> GeoPoint {
        match self.geocoder.forward(&parcel.receiver_address).await {
            Ok(Some(place)) => {
                self.count_provider("geocode", "ok");
                place.point
            }
            Ok(None) => {
                self.count_provider("geocode", "miss");
                debug!(
                    address = %parcel.receiver_address,
                    "receiver address did not geocode; using offset fallback"
                );
                offset_point(
                    current,
                    DESTINATION_FALLBACK_OFFSET_DEG,
                    DESTINATION_FALLBACK_OFFSET_DEG,
                )
            }
            Err(err) => {
                self.count_provider("geocode", "error");
                warn!(error = %err, "destination geocoding failed; using offset fallback");
                offset_point(
                    current,
                    DESTINATION_FALLBACK_OFFSET_DEG,
                    DESTINATION_FALLBACK_OFFSET_DEG,
                )
            }
        }
    }

    async fn resolve_route(&self, origin: &GeoPoint, destination: &GeoPoint) -> RouteOutcome {
        match self.router.route(origin, destination).await {
            Ok(route) => {
                self.count_provider("route", "ok");
                RouteOutcome::Resolved { route }
            }
            Err(err) => {
                self.count_provider("route", "error");
                warn!(error = %err, "route resolution failed; straight-line fallback");
                RouteOutcome::Unavailable
            }
        }
    }

    async fn reverse_description(&self, point: &GeoPoint) -> Option<String> {
        match self.geocoder.reverse(point).await {
            Ok(Some(name)) => {
                self.count_provider("geocode", "ok");
                Some(name)
            }
            Ok(None) => {
                self.count_provider("geocode", "miss");
                None
            }
            Err(err) => {
                self.count_provider("geocode", "error");
                debug!(error = %err, "reverse geocoding failed");
                None
            }
        }
    }

    /// Write map state unless the lookup has been superseded meanwhile.
    fn apply_map(&self, generation: u64, map: MapCoordinates) -> bool {
        let mut slot = self.map.write().expect("map state lock");
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding map update from superseded lookup");
            return false;
        }
        *slot = Some(map);
        true
    }

    async fn apply_live_update(
        &self,
        generation: u64,
        tracking_id: &str,
        update: LocationUpdate,
        destination: GeoPoint,
    ) {
        let route = self.resolve_route(&update.point, &destination).await;

        let description = match update.location_description.clone() {
            Some(text) => text,
            None => self
                .reverse_description(&update.point)
                .await
                .unwrap_or_else(|| {
                    format!("Near {:.5}, {:.5}", update.point.lat, update.point.lng)
                }),
        };

        let map = MapCoordinates {
            current: update.point,
            destination,
            current_description: Some(description),
            route_distance_km: route.distance_km(),
        };

        if !self.apply_map(generation, map.clone()) {
            return;
        }

        let _ = self.events_tx.send(SessionEvent {
            tracking_id: tracking_id.to_string(),
            map,
            route,
            last_updated: update.recorded_at,
        });
    }

    fn count_provider(&self, provider: &str, outcome: &str) {
        self.metrics
            .provider_requests_total
            .with_label_values(&[provider, outcome])
            .inc();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.live_task.lock().expect("live task lock").take() {
            task.abort();
        }
    }
}
