// src/services/expiry.rs

use chrono::NaiveDate;

use crate::models::inventory::{ExpiryAlert, InventoryItem};

pub const DEFAULT_THRESHOLD_DAYS: i64 = 5;

/// Alerts for every item expiring within `threshold_days` of `today`, already-expired items
/// included. Output follows input order.
pub fn expiry_alerts(
    items: &[InventoryItem],
    today: NaiveDate,
    threshold_days: i64,
) -> Vec<ExpiryAlert> {
    items
        .iter()
        .filter_map(|item| {
            let days_left = (item.expiry_date - today).num_days();
            (days_left <= threshold_days).then(|| ExpiryAlert {
                name: item.name.clone(),
                days_left,
                expiry_date: item.expiry_date,
            })
        })
        .collect()
}
