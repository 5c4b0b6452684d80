//! Constants used throughout the Kinetic core crate.
//!
//! Persistence key names are part of the on-device format and must not change between
//! releases; a renamed key reads back as "absent" and silently resets the account.

/// Credits granted by the one-time welcome bonus. Assigned, never added.
pub const INITIAL_BONUS_CREDITS: u32 = 5;

/// Days a refreshed balance stays spendable.
pub const POINTS_VALIDITY_DAYS: i64 = 30;

/// Credits earned by one recorded contribution.
pub const CONTRIBUTION_REWARD_CREDITS: u32 = 1;

/// Credits spent by one unlock.
pub const UNLOCK_COST_CREDITS: u32 = 1;

/// Persistence key: credit balance as a decimal string.
pub const CREDITS_KEY: &str = "credits";

/// Persistence key: `"true"` or `"false"`.
pub const OPTED_IN_KEY: &str = "opted_in";

/// Persistence key: `"true"` once the welcome bonus has been granted.
pub const INITIAL_CREDITS_AWARDED_KEY: &str = "initial_credits_awarded";

/// Persistence key: RFC 3339 expiry timestamp; absent when no expiry is set.
pub const POINTS_EXPIRY_KEY: &str = "points_expiry";

/// Persistence key: JSON-serialised contribution form draft.
pub const DRAFT_STORAGE_KEY: &str = "kinetic_contribution_draft";

/// Default debounce between the last form edit and the draft write.
pub const DEFAULT_DRAFT_DEBOUNCE_MS: u64 = 1_000;

/// Longest accepted draft debounce (ten minutes).
pub const MAX_DRAFT_DEBOUNCE_MS: u64 = 600_000;

/// Default number of delivery attempts per contribution.
pub const DEFAULT_SUBMISSION_ATTEMPTS: u32 = 3;

/// Default probability that the simulated transport fails a delivery.
pub const DEFAULT_SIMULATED_FAILURE_RATE: f64 = 0.02;

/// Default clinic display name.
pub const DEFAULT_CLINIC_NAME: &str = "Riversdale Physio";

/// Default clinic identifier shown on the settings screen.
pub const DEFAULT_CLINIC_ID: &str = "KIN-ORG-882192";

/// Default anonymised source tag stamped on contributed entries.
pub const DEFAULT_SOURCE_CLINIC_HASH: &str = "RIVERSDALE_PHYSIO";

/// Default file backing the CLI's key/value store.
pub const DEFAULT_DATA_FILE: &str = "kinetic_data.json";

/// Placeholder date-of-birth label for patients created from a contribution.
pub const UNKNOWN_DOB_LABEL: &str = "Unknown";
