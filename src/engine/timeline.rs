use tracing::{debug, warn};

use crate::models::event::{Provenance, RawEventRecord, TrackingEvent};
use crate::models::parcel::{Parcel, ParcelStatus};

// Two events with the same status within this window are one event reported
// twice by independent writers.
const DEDUP_WINDOW_MS: i64 = 1_000;

pub fn status_title(status: &ParcelStatus) -> &'static str {
    match status {
        ParcelStatus::Registered => "Parcel Registered",
        ParcelStatus::InTransit => "In Transit",
        ParcelStatus::OutForDelivery => "Out for Delivery",
        ParcelStatus::Delivered => "Delivered",
        ParcelStatus::Other(_) => "Status Update",
    }
}

pub fn status_description(status: &ParcelStatus) -> String {
    match status {
        ParcelStatus::Registered => "Parcel has been registered".to_string(),
        ParcelStatus::InTransit => "Parcel is in transit to delivery location".to_string(),
        ParcelStatus::OutForDelivery => "Parcel is out for delivery to recipient".to_string(),
        ParcelStatus::Delivered => "Parcel has been delivered successfully".to_string(),
        ParcelStatus::Other(raw) => format!("Status updated to: {raw}"),
    }
}

pub fn status_icon(status: &ParcelStatus) -> &'static str {
    match status {
        ParcelStatus::Registered => "cube-outline",
        ParcelStatus::InTransit => "car-outline",
        ParcelStatus::OutForDelivery => "bicycle-outline",
        ParcelStatus::Delivered => "checkmark-circle-outline",
        ParcelStatus::Other(_) => "ellipse-outline",
    }
}

/// Merge the parcel record and its event log into one deduplicated timeline,
/// newest first. Consumers needing chronological order re-sort explicitly.
pub fn build_timeline(parcel: &Parcel, entries: Vec<RawEventRecord>) -> Vec<TrackingEvent> {
    let mut events = Vec::with_capacity(entries.len() + 2);

    // The registration event always exists, even with an empty log.
    events.push(TrackingEvent {
        title: status_title(&ParcelStatus::Registered).to_string(),
        status: ParcelStatus::Registered,
        description: status_description(&ParcelStatus::Registered),
        timestamp_ms: parcel.created_at.timestamp_millis(),
        location: Some(parcel.pickup_location.clone()),
        courier_name: None,
        photo_url: None,
        icon: status_icon(&ParcelStatus::Registered),
        active: true,
        provenance: Provenance::ParcelRecord,
    });

    for record in entries {
        let status = ParcelStatus::parse(&record.status);
        if !status.is_canonical() {
            debug!(status = %record.status, "skipping non-canonical log entry");
            continue;
        }

        let Some(timestamp_ms) = record.timestamp.to_epoch_ms() else {
            warn!(status = %record.status, "dropping log entry with unreadable timestamp");
            continue;
        };

        if is_duplicate(&events, &status, timestamp_ms) {
            debug!(
                status = status.as_str(),
                timestamp_ms, "dropping duplicate log entry"
            );
            continue;
        }

        events.push(TrackingEvent {
            title: record
                .title
                .unwrap_or_else(|| status_title(&status).to_string()),
            description: record
                .description
                .unwrap_or_else(|| status_description(&status)),
            timestamp_ms,
            location: record.location,
            courier_name: record.courier_name,
            photo_url: record.photo_url,
            icon: status_icon(&status),
            active: true,
            provenance: Provenance::EventLog,
            status,
        });
    }

    synthesize_terminal_event(parcel, &mut events);

    events.sort_by_key(|event| std::cmp::Reverse(event.timestamp_ms));
    events
}

fn is_duplicate(events: &[TrackingEvent], status: &ParcelStatus, timestamp_ms: i64) -> bool {
    events
        .iter()
        .any(|event| event.status == *status && (event.timestamp_ms - timestamp_ms).abs() <= DEDUP_WINDOW_MS)
}

// The parcel record may claim a terminal state the log never recorded; the
// log stays authoritative, the record only fills the gap.
fn synthesize_terminal_event(parcel: &Parcel, events: &mut Vec<TrackingEvent>) {
    if !matches!(
        parcel.status,
        ParcelStatus::OutForDelivery | ParcelStatus::Delivered
    ) {
        return;
    }

    if events.iter().any(|event| event.status == parcel.status) {
        return;
    }

    let timestamp_ms = match parcel.status {
        ParcelStatus::Delivered => parcel
            .delivered_at
            .unwrap_or(parcel.updated_at)
            .timestamp_millis(),
        _ => parcel.updated_at.timestamp_millis(),
    };

    let location = parcel
        .location_description
        .clone()
        .unwrap_or_else(|| parcel.receiver_address.clone());

    events.push(TrackingEvent {
        title: status_title(&parcel.status).to_string(),
        status: parcel.status.clone(),
        description: status_description(&parcel.status),
        timestamp_ms,
        location: Some(location),
        courier_name: parcel.courier_name.clone(),
        photo_url: match parcel.status {
            ParcelStatus::Delivered => parcel.proof_photo_url.clone(),
            _ => None,
        },
        icon: status_icon(&parcel.status),
        active: true,
        provenance: Provenance::ParcelRecord,
    });
}
