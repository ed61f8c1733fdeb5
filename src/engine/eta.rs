use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use crate::models::eta::EstimatedDelivery;
use crate::models::parcel::{Parcel, ParcelStatus};

const BASE_SPEED_KMH: f64 = 80.0;
const TRAFFIC_FACTOR: f64 = 0.8;
const SORTING_HOURS: f64 = 1.0;
const LOADING_HOURS: f64 = 0.5;
const PER_STOP_HOURS: f64 = 0.25;
const HALF_DAY_BUFFER: f64 = 0.5;
const RUSH_FACTOR: f64 = 1.4;
const WEEKEND_BACKLOG_FACTOR: f64 = 1.25;
const BUSINESS_CLOSE_HOUR: u32 = 18;
const REST_DAY: Weekday = Weekday::Sun;

/// Heuristic delivery estimate. Pure: identical `(parcel, distance, now)`
/// inputs always produce identical output. `None` iff already delivered.
pub fn estimate(
    parcel: &Parcel,
    distance_km: Option<f64>,
    now: DateTime<Utc>,
) -> Option<EstimatedDelivery> {
    if parcel.status == ParcelStatus::Delivered {
        return None;
    }

    let usable_distance = distance_km.filter(|d| d.is_finite() && *d >= 0.0);
    let mut hours = match usable_distance {
        Some(distance) => {
            let travel = distance / (BASE_SPEED_KMH * TRAFFIC_FACTOR);
            travel
                + SORTING_HOURS
                + LOADING_HOURS
                + f64::from(estimated_stops(distance)) * PER_STOP_HOURS
                + tier_overhead_hours(distance)
        }
        None => fallback_hours(&parcel.status),
    };

    if is_rush_hour(now.hour()) {
        hours *= RUSH_FACTOR;
    }
    if matches!(now.weekday(), Weekday::Fri | Weekday::Sat) {
        hours *= WEEKEND_BACKLOG_FACTOR;
    }

    let working_days = ((hours / 24.0).ceil() + HALF_DAY_BUFFER).ceil().max(1.0) as i64;

    let mut cursor = parcel.created_at.date_naive();
    if now.hour() >= BUSINESS_CLOSE_HOUR {
        cursor = cursor.succ_opt()?;
    }

    let mut remaining = working_days;
    while remaining > 0 {
        cursor = cursor.succ_opt()?;
        if cursor.weekday() != REST_DAY {
            remaining -= 1;
        }
    }

    let days_remaining = (cursor - now.date_naive()).num_days().max(0);

    Some(EstimatedDelivery {
        date: cursor,
        formatted_date: cursor.format("%d %b %Y").to_string(),
        day_name: cursor.format("%A").to_string(),
        time_window: time_window(days_remaining, usable_distance, now.hour()),
        days_remaining,
    })
}

fn estimated_stops(distance_km: f64) -> u32 {
    if distance_km < 25.0 {
        1
    } else if distance_km < 100.0 {
        2
    } else if distance_km < 250.0 {
        4
    } else {
        6
    }
}

fn tier_overhead_hours(distance_km: f64) -> f64 {
    if distance_km < 50.0 {
        0.0
    } else if distance_km < 150.0 {
        12.0
    } else if distance_km < 300.0 {
        24.0
    } else {
        48.0
    }
}

fn fallback_hours(status: &ParcelStatus) -> f64 {
    match status {
        ParcelStatus::Registered => 72.0,
        ParcelStatus::InTransit => 36.0,
        ParcelStatus::OutForDelivery => 8.0,
        _ => 48.0,
    }
}

fn is_rush_hour(hour: u32) -> bool {
    matches!(hour, 7 | 8 | 17 | 18)
}

fn time_window(days_remaining: i64, distance_km: Option<f64>, hour: u32) -> String {
    if days_remaining == 0 {
        let window = if hour < 10 {
            "10:00 AM - 6:00 PM"
        } else if hour < 14 {
            "2:00 PM - 8:00 PM"
        } else {
            "Before 9:00 PM"
        };
        return window.to_string();
    }

    let window = match distance_km {
        Some(d) if d < 50.0 => "9:00 AM - 12:00 PM",
        Some(d) if d < 150.0 => "9:00 AM - 3:00 PM",
        Some(d) if d < 300.0 => "12:00 PM - 6:00 PM",
        _ => "9:00 AM - 6:00 PM",
    };
    window.to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::estimate;
    use crate::models::parcel::{Parcel, ParcelStatus};

    fn parcel(status: ParcelStatus, created: chrono::DateTime<Utc>) -> Parcel {
        Parcel {
            id: Uuid::from_u128(7),
            tracking_id: "TRK-ETA00001".to_string(),
            status,
            sender_name: "Aina".to_string(),
            sender_address: "Jalan Ampang, Kuala Lumpur".to_string(),
            receiver_name: "Farid".to_string(),
            receiver_address: "Georgetown, Penang".to_string(),
            pickup_location: "KL Sorting Hub".to_string(),
            created_at: created,
            updated_at: created,
            courier_id: None,
            courier_name: None,
            delivered_at: None,
            proof_photo_url: None,
            location_description: None,
        }
    }

    #[test]
    fn short_haul_weekday_registered_lands_two_days_out() {
        // Monday 09:00 creation, looked up at 11:00 the same day, 40 km:
        // 0.625 h travel + 1.5 h fixed + 0.5 h stops => 1 working day,
        // plus the half-day buffer => two calendar days.
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        let eta = estimate(&parcel(ParcelStatus::Registered, created), Some(40.0), now).unwrap();

        assert_eq!(eta.date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(eta.day_name, "Wednesday");
        assert_eq!(eta.days_remaining, 2);
        assert_eq!(eta.time_window, "9:00 AM - 12:00 PM");
    }

    #[test]
    fn delivered_parcel_has_no_estimate() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();

        assert!(estimate(&parcel(ParcelStatus::Delivered, created), Some(40.0), now).is_none());
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();
        let subject = parcel(ParcelStatus::InTransit, created);

        let first = estimate(&subject, Some(220.0), now).unwrap();
        let second = estimate(&subject, Some(220.0), now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn days_remaining_never_goes_negative() {
        // Lookup happens a month after the estimate would have fallen due.
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 11, 0, 0).unwrap();

        let eta = estimate(&parcel(ParcelStatus::InTransit, created), Some(40.0), now).unwrap();
        assert_eq!(eta.days_remaining, 0);
    }

    #[test]
    fn rest_day_is_skipped_in_the_walk() {
        // Friday creation with the Friday backlog factor still needs two
        // working days; Sunday the 7th must not count.
        let created = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();

        let eta = estimate(&parcel(ParcelStatus::Registered, created), Some(40.0), now).unwrap();
        assert_eq!(eta.date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(eta.day_name, "Monday");
    }

    #[test]
    fn lookup_after_business_close_pushes_the_walk_out() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let before_close = Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap();
        let after_close = Utc.with_ymd_and_hms(2024, 1, 1, 19, 0, 0).unwrap();

        let subject = parcel(ParcelStatus::Registered, created);
        let early = estimate(&subject, Some(40.0), before_close).unwrap();
        let late = estimate(&subject, Some(40.0), after_close).unwrap();

        assert!(late.date > early.date);
    }

    #[test]
    fn rush_hour_inflates_the_estimate() {
        // 320 km: 5 h travel + 3 h fixed + 48 h tier = 56 h. Off-peak that
        // is 4 working days with the buffer; at 08:00 the 1.4 factor lifts
        // it to 78.4 h and a fifth working day.
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap();
        let rush = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let calm = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        let subject = parcel(ParcelStatus::InTransit, created);
        let rush_eta = estimate(&subject, Some(320.0), rush).unwrap();
        let calm_eta = estimate(&subject, Some(320.0), calm).unwrap();

        assert!(rush_eta.date > calm_eta.date);
    }

    #[test]
    fn missing_distance_falls_back_to_status_hours() {
        // Registered without a distance: 72 h => 3 working days + buffer => 4.
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        let eta = estimate(&parcel(ParcelStatus::Registered, created), None, now).unwrap();
        assert_eq!(eta.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(eta.time_window, "9:00 AM - 6:00 PM");
    }

    #[test]
    fn same_day_window_narrows_as_the_day_progresses() {
        // Out for delivery, 5 km away, looked up well past the estimate
        // date so days_remaining clamps to zero.
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let subject = parcel(ParcelStatus::OutForDelivery, created);

        let morning = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap();

        let am = estimate(&subject, Some(5.0), morning).unwrap();
        let pm = estimate(&subject, Some(5.0), afternoon).unwrap();

        assert_eq!(am.time_window, "10:00 AM - 6:00 PM");
        assert_eq!(pm.time_window, "Before 9:00 PM");
    }

    #[test]
    fn non_finite_distance_is_treated_as_missing() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        let from_nan = estimate(&parcel(ParcelStatus::Registered, created), Some(f64::NAN), now);
        let from_none = estimate(&parcel(ParcelStatus::Registered, created), None, now);
        assert_eq!(from_nan, from_none);
    }
}
