use chrono::NaiveDate;
use serde::Serialize;

/// Estimated-delivery snapshot. Recomputed from scratch on each lookup,
/// never patched incrementally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedDelivery {
    pub date: NaiveDate,
    pub formatted_date: String,
    pub day_name: String,
    pub time_window: String,
    pub days_remaining: i64,
}
