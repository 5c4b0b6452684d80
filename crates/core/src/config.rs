//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the session. Core code
//! never reads environment variables itself; the binary reads them and hands the raw values to
//! the `*_from_env_value` helpers below.

use crate::constants::{
    DEFAULT_CLINIC_ID, DEFAULT_CLINIC_NAME, DEFAULT_DRAFT_DEBOUNCE_MS,
    DEFAULT_SIMULATED_FAILURE_RATE, DEFAULT_SOURCE_CLINIC_HASH, DEFAULT_SUBMISSION_ATTEMPTS,
    MAX_DRAFT_DEBOUNCE_MS,
};
use crate::{ClinicError, ClinicResult};
use kinetic_types::NonEmptyText;
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    clinic_name: String,
    clinic_id: String,
    source_clinic_hash: String,
    draft_debounce: Duration,
    submission_attempts: u32,
    simulated_failure_rate: f64,
}

impl CoreConfig {
    pub fn new(
        clinic_name: NonEmptyText,
        clinic_id: NonEmptyText,
        source_clinic_hash: NonEmptyText,
        draft_debounce: Duration,
        submission_attempts: u32,
        simulated_failure_rate: f64,
    ) -> ClinicResult<Self> {
        check_debounce(draft_debounce)?;
        if submission_attempts == 0 {
            return Err(ClinicError::InvalidInput(
                "submission_attempts must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&simulated_failure_rate) {
            return Err(ClinicError::InvalidInput(format!(
                "simulated_failure_rate must be between 0.0 and 1.0, got {}",
                simulated_failure_rate
            )));
        }

        Ok(Self {
            clinic_name: clinic_name.into_inner(),
            clinic_id: clinic_id.into_inner(),
            source_clinic_hash: source_clinic_hash.into_inner(),
            draft_debounce,
            submission_attempts,
            simulated_failure_rate,
        })
    }

    pub fn clinic_name(&self) -> &str {
        &self.clinic_name
    }

    pub fn clinic_id(&self) -> &str {
        &self.clinic_id
    }

    pub fn source_clinic_hash(&self) -> &str {
        &self.source_clinic_hash
    }

    pub fn draft_debounce(&self) -> Duration {
        self.draft_debounce
    }

    pub fn submission_attempts(&self) -> u32 {
        self.submission_attempts
    }

    pub fn simulated_failure_rate(&self) -> f64 {
        self.simulated_failure_rate
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            clinic_name: DEFAULT_CLINIC_NAME.to_string(),
            clinic_id: DEFAULT_CLINIC_ID.to_string(),
            source_clinic_hash: DEFAULT_SOURCE_CLINIC_HASH.to_string(),
            draft_debounce: Duration::from_millis(DEFAULT_DRAFT_DEBOUNCE_MS),
            submission_attempts: DEFAULT_SUBMISSION_ATTEMPTS,
            simulated_failure_rate: DEFAULT_SIMULATED_FAILURE_RATE,
        }
    }
}

fn check_debounce(debounce: Duration) -> ClinicResult<()> {
    if debounce > Duration::from_millis(MAX_DRAFT_DEBOUNCE_MS) {
        return Err(ClinicError::InvalidInput(format!(
            "draft debounce must be at most {} ms, got {} ms",
            MAX_DRAFT_DEBOUNCE_MS,
            debounce.as_millis()
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an optional text value, falling back to `default` when unset or blank.
pub fn text_from_env_value(value: Option<String>, default: &str) -> ClinicResult<NonEmptyText> {
    let value = non_blank(value).unwrap_or_else(|| default.to_string());
    Ok(NonEmptyText::new(value)?)
}

/// Parses a debounce in milliseconds. Unset or blank yields the 1 s default.
///
/// Values above ten minutes are rejected with `ClinicError::InvalidInput`.
pub fn debounce_from_env_value(value: Option<String>) -> ClinicResult<Duration> {
    let parsed = non_blank(value)
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                ClinicError::InvalidInput(format!("draft debounce must be milliseconds, got '{}'", v))
            })
        })
        .transpose()?;
    let debounce = Duration::from_millis(parsed.unwrap_or(DEFAULT_DRAFT_DEBOUNCE_MS));
    check_debounce(debounce)?;
    Ok(debounce)
}

/// Parses the number of delivery attempts. Unset or blank yields the default.
pub fn attempts_from_env_value(value: Option<String>) -> ClinicResult<u32> {
    let parsed = non_blank(value)
        .map(|v| {
            v.parse::<u32>().map_err(|_| {
                ClinicError::InvalidInput(format!("submission attempts must be a count, got '{}'", v))
            })
        })
        .transpose()?;
    Ok(parsed.unwrap_or(DEFAULT_SUBMISSION_ATTEMPTS))
}

/// Parses the simulated failure probability. Unset or blank yields 0.02.
pub fn failure_rate_from_env_value(value: Option<String>) -> ClinicResult<f64> {
    let parsed = non_blank(value)
        .map(|v| {
            v.parse::<f64>().map_err(|_| {
                ClinicError::InvalidInput(format!("failure rate must be a number, got '{}'", v))
            })
        })
        .transpose()?;
    Ok(parsed.unwrap_or(DEFAULT_SIMULATED_FAILURE_RATE))
}
