use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical parcel lifecycle states. Unrecognized strings from external
/// writers are carried through as `Other` instead of failing the lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelStatus {
    Registered,
    InTransit,
    OutForDelivery,
    Delivered,
    Other(String),
}

impl ParcelStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Registered" => ParcelStatus::Registered,
            "In Transit" => ParcelStatus::InTransit,
            "Out for Delivery" => ParcelStatus::OutForDelivery,
            "Delivered" => ParcelStatus::Delivered,
            other => ParcelStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ParcelStatus::Registered => "Registered",
            ParcelStatus::InTransit => "In Transit",
            ParcelStatus::OutForDelivery => "Out for Delivery",
            ParcelStatus::Delivered => "Delivered",
            ParcelStatus::Other(raw) => raw,
        }
    }

    /// True for the four statuses the timeline retains.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, ParcelStatus::Other(_))
    }

    /// Statuses under which the courier is expected to be moving, so live
    /// tracking is worth starting.
    pub fn is_moving(&self) -> bool {
        matches!(self, ParcelStatus::InTransit | ParcelStatus::OutForDelivery)
    }
}

impl Default for ParcelStatus {
    fn default() -> Self {
        ParcelStatus::Registered
    }
}

impl Serialize for ParcelStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParcelStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ParcelStatus::parse(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_id: String,
    // Writers may omit the status entirely; a fresh parcel is Registered.
    #[serde(default)]
    pub status: ParcelStatus,
    pub sender_name: String,
    pub sender_address: String,
    pub receiver_name: String,
    pub receiver_address: String,
    pub pickup_location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub courier_id: Option<Uuid>,
    pub courier_name: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub proof_photo_url: Option<String>,
    pub location_description: Option<String>,
}
