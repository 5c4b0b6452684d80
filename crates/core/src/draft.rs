//! Debounced autosave of the contribution form.
//!
//! Edits are not written straight away. [`DraftAutosave::record_edit`] schedules a save
//! `debounce` after the latest edit, and each new edit replaces the pending snapshot and pushes
//! the deadline out. The caller drives time by calling [`DraftAutosave::flush_due`] from its
//! event loop.
//!
//! There is no cancellation: a superseded save simply never happens, and a late write always
//! carries the newest snapshot.

use crate::clock::Clock;
use crate::constants::{DRAFT_STORAGE_KEY, MAX_DRAFT_DEBOUNCE_MS};
use crate::contribution::ContributionForm;
use crate::error::{ClinicError, ClinicResult};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct PendingSave {
    form: ContributionForm,
    due_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DraftAutosave {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    debounce: chrono::Duration,
    pending: Option<PendingSave>,
    last_saved: Option<DateTime<Utc>>,
}

impl DraftAutosave {
    /// `debounce` is capped at [`MAX_DRAFT_DEBOUNCE_MS`]; `CoreConfig` rejects anything longer.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, debounce: Duration) -> Self {
        let millis = debounce
            .as_millis()
            .min(u128::from(MAX_DRAFT_DEBOUNCE_MS));
        let debounce = chrono::Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX));
        Self {
            store,
            clock,
            debounce,
            pending: None,
            last_saved: None,
        }
    }

    /// Returns the saved draft, if any.
    ///
    /// An unreadable draft is logged and reported as absent so the form can start fresh.
    pub fn load(&mut self) -> ClinicResult<Option<ContributionForm>> {
        let Some(raw) = self.store.get(DRAFT_STORAGE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<ContributionForm>(&raw) {
            Ok(form) => {
                self.last_saved = Some(self.clock.now());
                Ok(Some(form))
            }
            Err(e) => {
                tracing::warn!("failed to parse saved draft: {}", e);
                Ok(None)
            }
        }
    }

    pub fn record_edit(&mut self, form: ContributionForm) {
        // Past the end of representable time the draft waits for an explicit flush.
        let due_at = self
            .clock
            .now()
            .checked_add_signed(self.debounce)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.pending = Some(PendingSave { form, due_at });
    }

    /// Writes the pending snapshot if its debounce has elapsed. Returns whether a write happened.
    pub fn flush_due(&mut self) -> ClinicResult<bool> {
        let now = self.clock.now();
        let due = self
            .pending
            .as_ref()
            .map_or(false, |pending| now >= pending.due_at);
        if due {
            self.flush_now()
        } else {
            Ok(false)
        }
    }

    /// Writes the pending snapshot immediately. Returns whether there was anything to write.
    pub fn flush_now(&mut self) -> ClinicResult<bool> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };
        let json = match serde_json::to_string(&pending.form) {
            Ok(json) => json,
            Err(e) => {
                self.pending = Some(pending);
                return Err(ClinicError::Draft(e));
            }
        };
        if let Err(e) = self.store.set(DRAFT_STORAGE_KEY, &json) {
            self.pending = Some(pending);
            return Err(e.into());
        }

        let now = self.clock.now();
        self.last_saved = Some(now);
        tracing::debug!("contribution draft saved at {}", now);
        Ok(true)
    }

    /// Drops any pending save and removes the stored draft.
    pub fn clear(&mut self) -> ClinicResult<()> {
        self.pending = None;
        self.last_saved = None;
        self.store.remove(DRAFT_STORAGE_KEY)?;
        Ok(())
    }

    /// True while an edit is waiting for its debounce to elapse.
    pub fn is_saving(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }
}
