//! Clinic credit ledger.
//!
//! [`ClinicLedger`] is the single owner of the [`ClinicAccount`]. Every credit and consent
//! mutation goes through one of its actions; callers only ever see the account through a shared
//! reference.
//!
//! ## Consent state machine
//!
//! ```text
//!             opt_in (bonus not yet granted)
//! OptedOut ─────────────────────────────────▶ OptedIn·FirstTime   balance := 5, expiry := now+30d
//!    ▲  │     opt_in (bonus already granted)
//!    │  └──────────────────────────────────▶ OptedIn·Returning   balance kept, no bonus
//!    │                 opt_out
//!    └───────────────────────────────────── OptedIn              balance := 0, unlocks kept
//! ```
//!
//! `has_received_initial_bonus` only ever goes false → true.
//!
//! ## Persistence
//!
//! After each balance or consent change the durable fields are written to the
//! [`KeyValueStore`] as a full snapshot, so a late write can only ever be a newer snapshot
//! (last write wins). A failed write is logged and the in-memory state stands.

use crate::clock::Clock;
use crate::constants::{
    CONTRIBUTION_REWARD_CREDITS, CREDITS_KEY, INITIAL_BONUS_CREDITS, INITIAL_CREDITS_AWARDED_KEY,
    OPTED_IN_KEY, POINTS_EXPIRY_KEY, UNLOCK_COST_CREDITS,
};
use crate::error::{ClinicResult, LedgerError, StoreError};
use crate::expiry::{refreshed_expiry, ExpiryStatus};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use kinetic_types::PatientId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Credit and consent state for this clinic on this device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClinicAccount {
    pub credit_balance: u32,
    pub opted_in: bool,
    pub has_received_initial_bonus: bool,
    pub points_expiry: Option<DateTime<Utc>>,
    /// Grows for the lifetime of the session; opting out does not prune it.
    pub unlocked_patient_ids: BTreeSet<PatientId>,
    pub contribution_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptInOutcome {
    /// First opt-in ever: the welcome bonus was granted.
    FirstTimeBonus {
        balance: u32,
        expires_at: DateTime<Utc>,
    },
    /// The bonus was granted before; the held balance is kept.
    Restored { balance: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked { balance: u32 },
    /// Already in the unlock set; nothing was spent.
    AlreadyUnlocked,
}

#[derive(Debug)]
pub struct ClinicLedger {
    account: ClinicAccount,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ClinicLedger {
    /// A fresh account with default values. Nothing is read from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::from_account(ClinicAccount::default(), store, clock)
    }

    /// Resumes from an existing account snapshot.
    pub fn from_account(
        account: ClinicAccount,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            account,
            store,
            clock,
        }
    }

    /// Reads the durable fields from `store`.
    ///
    /// Missing keys take their default. Malformed values are logged and also take their
    /// default. Only a failing store is an error.
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> ClinicResult<Self> {
        let credit_balance = read_parsed(store.as_ref(), CREDITS_KEY, |v| v.parse::<u32>().ok())?
            .unwrap_or(0);
        let opted_in = read_parsed(store.as_ref(), OPTED_IN_KEY, parse_flag)?.unwrap_or(false);
        let has_received_initial_bonus =
            read_parsed(store.as_ref(), INITIAL_CREDITS_AWARDED_KEY, parse_flag)?.unwrap_or(false);
        let points_expiry = read_parsed(store.as_ref(), POINTS_EXPIRY_KEY, |v| {
            DateTime::parse_from_rfc3339(v)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })?;

        let account = ClinicAccount {
            credit_balance,
            opted_in,
            has_received_initial_bonus,
            points_expiry,
            ..ClinicAccount::default()
        };

        tracing::debug!(
            "loaded clinic account: credits={} opted_in={} bonus={}",
            account.credit_balance,
            account.opted_in,
            account.has_received_initial_bonus
        );

        Ok(Self::from_account(account, store, clock))
    }

    pub fn account(&self) -> &ClinicAccount {
        &self.account
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn expiry_status(&self) -> ExpiryStatus {
        ExpiryStatus::evaluate(self.account.points_expiry, self.clock.now())
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_status().is_expired()
    }

    pub fn is_unlocked(&self, patient_id: &PatientId) -> bool {
        self.account.unlocked_patient_ids.contains(patient_id)
    }

    pub fn opt_in(&mut self) -> OptInOutcome {
        self.account.opted_in = true;

        let outcome = if self.account.has_received_initial_bonus {
            OptInOutcome::Restored {
                balance: self.account.credit_balance,
            }
        } else {
            let expires_at = refreshed_expiry(self.clock.now());
            self.account.credit_balance = INITIAL_BONUS_CREDITS;
            self.account.has_received_initial_bonus = true;
            self.account.points_expiry = Some(expires_at);
            OptInOutcome::FirstTimeBonus {
                balance: INITIAL_BONUS_CREDITS,
                expires_at,
            }
        };

        match outcome {
            OptInOutcome::FirstTimeBonus { balance, .. } => {
                tracing::info!("opted in: welcome bonus granted, balance={}", balance)
            }
            OptInOutcome::Restored { balance } => {
                tracing::info!("opted in: returning clinic, balance={}", balance)
            }
        }

        self.persist();
        outcome
    }

    pub fn opt_out(&mut self) {
        self.account.opted_in = false;
        self.account.credit_balance = 0;
        tracing::info!(
            "opted out: balance zeroed, {} unlocked record(s) retained",
            self.account.unlocked_patient_ids.len()
        );
        self.persist();
    }

    /// Spends one credit to unlock `patient_id`'s history.
    ///
    /// Checks run in a fixed order: consent, then idempotency, then expiry, then balance.
    /// Re-unlocking an already unlocked patient is free and succeeds even when expired or
    /// out of credits.
    pub fn unlock(&mut self, patient_id: &PatientId) -> Result<UnlockOutcome, LedgerError> {
        if !self.account.opted_in {
            return Err(LedgerError::NotOptedIn);
        }
        if self.is_unlocked(patient_id) {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }
        if self.is_expired() {
            return Err(LedgerError::Expired);
        }
        let balance = self
            .account
            .credit_balance
            .checked_sub(UNLOCK_COST_CREDITS)
            .ok_or(LedgerError::InsufficientCredits)?;

        self.account.credit_balance = balance;
        self.account
            .unlocked_patient_ids
            .insert(patient_id.clone());
        tracing::info!("unlocked history for {}, balance={}", patient_id, balance);

        self.persist();
        Ok(UnlockOutcome::Unlocked { balance })
    }

    /// Applies the ledger side of a recorded contribution and returns the new balance.
    ///
    /// Only the contribution recorder calls this, after delivery has succeeded.
    pub(crate) fn credit_contribution(&mut self, patient_id: &PatientId) -> u32 {
        let account = &mut self.account;
        account.credit_balance = account
            .credit_balance
            .saturating_add(CONTRIBUTION_REWARD_CREDITS);
        account.contribution_count = account.contribution_count.saturating_add(1);
        account.points_expiry = Some(refreshed_expiry(self.clock.now()));
        account.unlocked_patient_ids.insert(patient_id.clone());

        let balance = account.credit_balance;
        self.persist();
        balance
    }

    fn persist(&self) {
        if let Err(e) = self.write_snapshot() {
            tracing::warn!("failed to persist clinic account: {}", e);
        }
    }

    fn write_snapshot(&self) -> Result<(), StoreError> {
        let account = &self.account;
        self.store
            .set(CREDITS_KEY, &account.credit_balance.to_string())?;
        self.store.set(OPTED_IN_KEY, flag(account.opted_in))?;
        self.store.set(
            INITIAL_CREDITS_AWARDED_KEY,
            flag(account.has_received_initial_bonus),
        )?;
        match account.points_expiry {
            Some(expiry) => self.store.set(POINTS_EXPIRY_KEY, &expiry.to_rfc3339())?,
            None => self.store.remove(POINTS_EXPIRY_KEY)?,
        }
        Ok(())
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn read_parsed<T>(
    store: &dyn KeyValueStore,
    key: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> ClinicResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!("ignoring malformed stored value for '{}': {:?}", key, raw);
    }
    Ok(parsed)
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Action {
        OptIn,
        OptOut,
        Unlock(u8),
        Contribute(u8),
        AdvanceDays(i64),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::OptIn),
            Just(Action::OptOut),
            (0u8..6).prop_map(Action::Unlock),
            (0u8..6).prop_map(Action::Contribute),
            (0i64..45).prop_map(Action::AdvanceDays),
        ]
    }

    fn pid(n: u8) -> PatientId {
        PatientId::new(format!("P{:03}", n)).unwrap()
    }

    proptest! {
        /// Spends never overdraw, repeats are free and the bonus is granted at most once.
        #[test]
        fn ledger_invariants_hold_for_any_action_sequence(
            actions in proptest::collection::vec(action(), 1..80)
        ) {
            let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
            let mut ledger = ClinicLedger::new(Arc::new(MemoryStore::new()), clock.clone());
            let mut bonuses = 0;
            let mut unlocked_ever = 0usize;

            for action in actions {
                let before = ledger.account().clone();
                match action {
                    Action::OptIn => {
                        if let OptInOutcome::FirstTimeBonus { .. } = ledger.opt_in() {
                            bonuses += 1;
                        }
                    }
                    Action::OptOut => {
                        ledger.opt_out();
                        prop_assert_eq!(ledger.account().credit_balance, 0);
                    }
                    Action::Unlock(n) => match ledger.unlock(&pid(n)) {
                        Ok(UnlockOutcome::Unlocked { balance }) => {
                            prop_assert_eq!(balance + 1, before.credit_balance);
                        }
                        Ok(UnlockOutcome::AlreadyUnlocked) | Err(_) => {
                            prop_assert_eq!(ledger.account().credit_balance, before.credit_balance);
                        }
                    },
                    Action::Contribute(n) => {
                        ledger.credit_contribution(&pid(n));
                    }
                    Action::AdvanceDays(days) => clock.advance(Duration::days(days)),
                }

                prop_assert!(bonuses <= 1);
                if before.has_received_initial_bonus {
                    prop_assert!(ledger.account().has_received_initial_bonus);
                }
                let unlocked_now = ledger.account().unlocked_patient_ids.len();
                prop_assert!(unlocked_now >= unlocked_ever);
                unlocked_ever = unlocked_now;
            }
        }
    }
}
