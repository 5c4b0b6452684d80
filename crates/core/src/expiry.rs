//! Points expiry policy.
//!
//! Expiry gates *spending* only. A stale balance is still shown to the user.

use crate::constants::POINTS_VALIDITY_DAYS;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Active,
    Expired,
}

impl ExpiryStatus {
    /// `Expired` only when an expiry is set and `now` is strictly after it.
    pub fn evaluate(points_expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match points_expiry {
            Some(expiry) if now > expiry => ExpiryStatus::Expired,
            _ => ExpiryStatus::Active,
        }
    }

    pub fn is_expired(self) -> bool {
        matches!(self, ExpiryStatus::Expired)
    }
}

/// Expiry for a balance refreshed at `now`.
pub fn refreshed_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(POINTS_VALIDITY_DAYS)
}
