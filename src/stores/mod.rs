pub mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::error::TrackError;
use crate::models::event::RawEventRecord;
use crate::models::location::CourierPosition;
use crate::models::parcel::Parcel;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for TrackError {
    fn from(err: StoreError) -> Self {
        TrackError::Internal(err.to_string())
    }
}

pub type PositionStream = Pin<Box<dyn Stream<Item = CourierPosition> + Send>>;

/// Authoritative parcel records, keyed by tracking identifier.
#[async_trait]
pub trait ParcelStore: Send + Sync {
    async fn get_by_tracking_id(&self, tracking_id: &str) -> Result<Option<Parcel>, StoreError>;
}

/// Append-only status event log.
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Raw events for one parcel, ordered by time ascending.
    async fn query_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Vec<RawEventRecord>, StoreError>;
}

/// Courier-reported positions, updated out of band by the courier-side
/// reporter.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn latest_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<CourierPosition>, StoreError>;

    /// Open a live subscription for one tracking id. The returned stream ends
    /// when the subscriber is dropped; cancellation is the caller's job.
    async fn watch_by_tracking_id(&self, tracking_id: &str) -> Result<PositionStream, StoreError>;
}
