use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::get;

use crate::engine::session::TrackingSnapshot;
use crate::error::TrackError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/track/:tracking_id", get(track_parcel))
}

async fn track_parcel(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<Json<TrackingSnapshot>, TrackError> {
    let snapshot = state.session.lookup(&tracking_id).await?;
    Ok(Json(snapshot))
}
