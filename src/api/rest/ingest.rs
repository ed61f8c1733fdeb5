use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::TrackError;
use crate::models::event::{RawEventRecord, RawTimestamp};
use crate::models::location::CourierPosition;
use crate::models::parcel::{Parcel, ParcelStatus};
use crate::state::AppState;
use crate::stores::ParcelStore;

// Reference producers: these endpoints stand in for the out-of-band writers
// (admin registration, status writers, the courier-side reporter) so the
// engine can be exercised end to end.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", post(register_parcel))
        .route("/events", post(append_event))
        .route("/positions", post(report_position))
}

#[derive(Deserialize)]
pub struct RegisterParcelRequest {
    pub tracking_id: Option<String>,
    pub sender_name: String,
    pub sender_address: String,
    pub receiver_name: String,
    pub receiver_address: String,
    pub pickup_location: String,
}

#[derive(Deserialize)]
pub struct AppendEventRequest {
    pub tracking_id: String,
    pub status: String,
    pub timestamp: Option<RawTimestamp>,
    pub location: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub courier_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ReportPositionRequest {
    pub tracking_id: String,
    pub lat: f64,
    pub lng: f64,
    pub location_description: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub accuracy_m: Option<f64>,
}

async fn register_parcel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterParcelRequest>,
) -> Result<Json<Parcel>, TrackError> {
    if payload.receiver_address.trim().is_empty() {
        return Err(TrackError::Validation(
            "receiver address cannot be empty".to_string(),
        ));
    }
    if payload.pickup_location.trim().is_empty() {
        return Err(TrackError::Validation(
            "pickup location cannot be empty".to_string(),
        ));
    }

    let tracking_id = match payload.tracking_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => generate_tracking_id(),
    };

    let now = Utc::now();
    let parcel = Parcel {
        id: Uuid::new_v4(),
        tracking_id,
        status: ParcelStatus::Registered,
        sender_name: payload.sender_name,
        sender_address: payload.sender_address,
        receiver_name: payload.receiver_name,
        receiver_address: payload.receiver_address,
        pickup_location: payload.pickup_location,
        created_at: now,
        updated_at: now,
        courier_id: None,
        courier_name: None,
        delivered_at: None,
        proof_photo_url: None,
        location_description: None,
    };

    state.parcels.upsert(parcel.clone());
    Ok(Json(parcel))
}

// One logical write: the event is appended to the log and the parcel record
// catches up with the new status.
async fn append_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AppendEventRequest>,
) -> Result<Json<RawEventRecord>, TrackError> {
    let tracking_id = payload.tracking_id.trim().to_string();
    let mut parcel = state
        .parcels
        .get_by_tracking_id(&tracking_id)
        .await?
        .ok_or_else(|| TrackError::NotFound(format!("no parcel for {tracking_id}")))?;

    let record = RawEventRecord {
        status: payload.status,
        timestamp: payload
            .timestamp
            .unwrap_or_else(|| RawTimestamp::Integer(Utc::now().timestamp_millis())),
        location: payload.location.clone(),
        title: payload.title,
        description: payload.description,
        courier_name: payload.courier_name.clone(),
        photo_url: payload.photo_url.clone(),
    };
    state.event_log.append(&tracking_id, record.clone());

    let status = ParcelStatus::parse(&record.status);
    let now = Utc::now();
    if status == ParcelStatus::Delivered {
        parcel.delivered_at = Some(now);
        parcel.proof_photo_url = payload.photo_url.or(parcel.proof_photo_url);
    }
    if payload.courier_name.is_some() {
        parcel.courier_name = payload.courier_name;
    }
    if payload.location.is_some() {
        parcel.location_description = payload.location;
    }
    parcel.status = status;
    parcel.updated_at = now;
    state.parcels.upsert(parcel);

    Ok(Json(record))
}

async fn report_position(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ReportPositionRequest>,
) -> Result<Json<CourierPosition>, TrackError> {
    let tracking_id = payload.tracking_id.trim().to_string();
    if tracking_id.is_empty() {
        return Err(TrackError::Validation(
            "tracking id cannot be empty".to_string(),
        ));
    }

    // Coordinates are not validated here; the tracker is the validation
    // boundary.
    let position = CourierPosition {
        lat: payload.lat,
        lng: payload.lng,
        location_description: payload.location_description,
        recorded_at: payload.recorded_at.unwrap_or_else(Utc::now),
        accuracy_m: payload.accuracy_m,
    };

    state.assignments.publish(&tracking_id, position.clone());
    Ok(Json(position))
}

fn generate_tracking_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TRK-{suffix}")
}
