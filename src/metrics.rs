// 📊 Metrics Engine - courier rating and earnings
//
// Rating rewards fast, batched delivery:
//   - completed orders are grouped by region and sorted by completion
//   - first order's duration   = complete_time - assign_time
//   - each next order's duration = complete_time - previous complete_time
//   - the fastest region average t (seconds) gives
//       rating = (3600 - min(t, 3600)) / 3600 * 5
//
// Earnings pay per trip: distinct assign_time values x 500 x type coefficient.

use crate::entities::{Courier, CourierType, Order};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

const HOUR_SECS: f64 = 3600.0;
const MAX_RATING: f64 = 5.0;
const BASE_PAYMENT: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourierMetrics {
    /// `None` until the courier completes an order
    pub rating: Option<f64>,
    pub earnings: u64,
}

/// Courier profile as returned by the info query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierInfo {
    #[serde(flatten)]
    pub courier: Courier,

    pub earnings: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl CourierInfo {
    /// Rating is reported with two decimals
    pub fn new(courier: Courier, metrics: CourierMetrics) -> Self {
        CourierInfo {
            courier,
            earnings: metrics.earnings,
            rating: metrics.rating.map(|r| (r * 100.0).round() / 100.0),
        }
    }
}

/// Lifecycle times of a finished delivery; orders missing either are skipped
fn delivery_times(order: &Order) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match (order.completed, order.assign_time, order.complete_time) {
        (true, Some(assigned), Some(completed)) => Some((assigned, completed)),
        _ => None,
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Average delivery duration (seconds) per region
pub fn region_averages(completed: &[Order]) -> BTreeMap<i64, f64> {
    let mut by_region: BTreeMap<i64, Vec<(DateTime<Utc>, DateTime<Utc>)>> = BTreeMap::new();
    for order in completed {
        if let Some(times) = delivery_times(order) {
            by_region.entry(order.region).or_default().push(times);
        }
    }

    by_region
        .into_iter()
        .map(|(region, mut deliveries)| {
            deliveries.sort_by_key(|(_, completed)| *completed);

            let mut total = 0.0;
            let mut previous: Option<DateTime<Utc>> = None;
            for (assigned, completed) in &deliveries {
                let start = previous.unwrap_or(*assigned);
                total += seconds_between(start, *completed);
                previous = Some(*completed);
            }

            (region, total / deliveries.len() as f64)
        })
        .collect()
}

pub fn rating(completed: &[Order]) -> Option<f64> {
    let fastest = region_averages(completed)
        .into_values()
        .fold(None, |best: Option<f64>, avg| Some(best.map_or(avg, |b| b.min(avg))))?;

    Some((HOUR_SECS - fastest.min(HOUR_SECS)) / HOUR_SECS * MAX_RATING)
}

/// Distinct assignment batches approximate trips; two batches sharing one
/// timestamp count once.
pub fn earnings(courier_type: CourierType, completed: &[Order]) -> u64 {
    let trips: HashSet<DateTime<Utc>> = completed
        .iter()
        .filter_map(|order| delivery_times(order).map(|(assigned, _)| assigned))
        .collect();

    trips.len() as u64 * BASE_PAYMENT * courier_type.earnings_coefficient()
}

pub fn compute(courier: &Courier, completed: &[Order]) -> CourierMetrics {
    CourierMetrics {
        rating: rating(completed),
        earnings: earnings(courier.courier_type, completed),
    }
}
