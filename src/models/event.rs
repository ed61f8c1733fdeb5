use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::models::parcel::ParcelStatus;

/// Which source produced a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    EventLog,
    ParcelRecord,
}

/// One point in a parcel's history. Immutable once constructed; the timeline
/// builder only appends and sorts.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingEvent {
    pub title: String,
    pub status: ParcelStatus,
    pub description: String,
    pub timestamp_ms: i64,
    pub location: Option<String>,
    pub courier_name: Option<String>,
    pub photo_url: Option<String>,
    pub icon: &'static str,
    pub active: bool,
    pub provenance: Provenance,
}

/// Timestamp as it arrives from external writers: epoch milliseconds, epoch
/// seconds (integer or fractional), a `{seconds, nanoseconds}` pair, or an
/// RFC 3339 string. Normalized to epoch milliseconds at ingress and never
/// branched on again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Composite { seconds: i64, nanoseconds: u32 },
    Integer(i64),
    Float(f64),
    Text(String),
}

// Integer values at or above this are taken as already being milliseconds;
// 1e12 ms is 2001-09-09, while 1e12 seconds is the year 33658.
const EPOCH_MS_THRESHOLD: i64 = 1_000_000_000_000;

impl RawTimestamp {
    pub fn to_epoch_ms(&self) -> Option<i64> {
        match self {
            RawTimestamp::Composite {
                seconds,
                nanoseconds,
            } => Some(seconds * 1000 + i64::from(*nanoseconds) / 1_000_000),
            RawTimestamp::Integer(value) => {
                if value.abs() >= EPOCH_MS_THRESHOLD {
                    Some(*value)
                } else {
                    Some(value * 1000)
                }
            }
            RawTimestamp::Float(value) => {
                if !value.is_finite() {
                    return None;
                }
                if value.abs() >= EPOCH_MS_THRESHOLD as f64 {
                    Some(*value as i64)
                } else {
                    Some((value * 1000.0) as i64)
                }
            }
            RawTimestamp::Text(value) => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|parsed| parsed.timestamp_millis()),
        }
    }
}

/// An untrusted event-log row, as returned by the event log store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEventRecord {
    pub status: String,
    pub timestamp: RawTimestamp,
    pub location: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub courier_name: Option<String>,
    pub photo_url: Option<String>,
}
