use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::models::event::RawEventRecord;
use crate::models::location::CourierPosition;
use crate::models::parcel::Parcel;
use crate::stores::{
    AssignmentStore, EventLogStore, ParcelStore, PositionStream, StoreError,
};

/// In-memory parcel records, fed by the ingest surface.
#[derive(Default)]
pub struct MemoryParcelStore {
    parcels: DashMap<String, Parcel>,
}

impl MemoryParcelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, parcel: Parcel) {
        self.parcels.insert(parcel.tracking_id.clone(), parcel);
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }
}

#[async_trait]
impl ParcelStore for MemoryParcelStore {
    async fn get_by_tracking_id(&self, tracking_id: &str) -> Result<Option<Parcel>, StoreError> {
        Ok(self.parcels.get(tracking_id).map(|entry| entry.clone()))
    }
}

/// In-memory append-only event log.
#[derive(Default)]
pub struct MemoryEventLog {
    events: DashMap<String, Vec<RawEventRecord>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, tracking_id: &str, record: RawEventRecord) {
        self.events
            .entry(tracking_id.to_string())
            .or_default()
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.events.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl EventLogStore for MemoryEventLog {
    async fn query_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Vec<RawEventRecord>, StoreError> {
        let mut records = self
            .events
            .get(tracking_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        records.sort_by_key(|record| record.timestamp.to_epoch_ms().unwrap_or(i64::MAX));
        Ok(records)
    }
}

/// In-memory courier position feed with per-tracking-id broadcast fan-out.
pub struct MemoryAssignmentStore {
    latest: DashMap<String, CourierPosition>,
    channels: DashMap<String, broadcast::Sender<CourierPosition>>,
    buffer_size: usize,
}

impl MemoryAssignmentStore {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            latest: DashMap::new(),
            channels: DashMap::new(),
            buffer_size,
        }
    }

    /// Record a courier position and fan it out to any watchers.
    pub fn publish(&self, tracking_id: &str, position: CourierPosition) {
        self.latest
            .insert(tracking_id.to_string(), position.clone());

        if let Some(tx) = self.channels.get(tracking_id) {
            // No receivers is fine; watchers come and go with sessions.
            let _ = tx.send(position);
        }
    }

    fn channel(&self, tracking_id: &str) -> broadcast::Sender<CourierPosition> {
        self.channels
            .entry(tracking_id.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .clone()
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn latest_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<CourierPosition>, StoreError> {
        Ok(self.latest.get(tracking_id).map(|entry| entry.clone()))
    }

    async fn watch_by_tracking_id(&self, tracking_id: &str) -> Result<PositionStream, StoreError> {
        let rx = self.channel(tracking_id).subscribe();
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());
        Ok(Box::pin(stream))
    }
}
