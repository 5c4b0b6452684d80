//! Clinic session facade.
//!
//! A [`ClinicSession`] is what a presentation layer drives. It owns the ledger, the patient
//! registry, the contribution recorder and the draft autosave, and it enforces the unlock gate
//! in front of history and reports.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::contribution::{
    ContributionForm, ContributionRecorder, ContributionRequest, Recorded, SubmissionTransport,
};
use crate::draft::DraftAutosave;
use crate::error::{ClinicError, ClinicResult};
use crate::expiry::ExpiryStatus;
use crate::history::{HistoryEntry, Patient};
use crate::ledger::{ClinicLedger, OptInOutcome, UnlockOutcome};
use crate::registry::PatientRegistry;
use crate::report::render_text_report;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use kinetic_types::PatientId;
use serde::Serialize;
use std::sync::Arc;

/// Dashboard view of the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub clinic_name: String,
    pub clinic_id: String,
    pub credits: u32,
    pub contribution_count: u32,
    pub unlocked_count: usize,
    pub opted_in: bool,
    pub expiry_status: ExpiryStatus,
    pub points_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ClinicSession<T> {
    cfg: CoreConfig,
    ledger: ClinicLedger,
    registry: PatientRegistry,
    recorder: ContributionRecorder<T>,
    drafts: DraftAutosave,
}

impl<T: SubmissionTransport> ClinicSession<T> {
    /// Starts a session from whatever account state `store` holds, with the seeded registry.
    pub fn load(
        cfg: CoreConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        transport: T,
    ) -> ClinicResult<Self> {
        let ledger = ClinicLedger::load(store.clone(), clock.clone())?;
        let recorder = ContributionRecorder::new(transport, &cfg);
        let drafts = DraftAutosave::new(store, clock, cfg.draft_debounce());
        Ok(Self {
            cfg,
            ledger,
            registry: PatientRegistry::with_seed_data(),
            recorder,
            drafts,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn ledger(&self) -> &ClinicLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &PatientRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &ContributionRecorder<T> {
        &self.recorder
    }

    pub fn drafts_mut(&mut self) -> &mut DraftAutosave {
        &mut self.drafts
    }

    pub fn opt_in(&mut self) -> OptInOutcome {
        self.ledger.opt_in()
    }

    pub fn opt_out(&mut self) {
        self.ledger.opt_out()
    }

    /// Spends a credit to unlock a known patient's history.
    pub fn unlock(&mut self, patient_id: &PatientId) -> ClinicResult<UnlockOutcome> {
        self.require_patient(patient_id)?;
        Ok(self.ledger.unlock(patient_id)?)
    }

    pub fn search(&self, term: &str) -> Vec<&Patient> {
        self.registry.search(term)
    }

    pub fn patients(&self) -> &[Patient] {
        self.registry.patients()
    }

    /// # Errors
    ///
    /// `PatientNotFound` for an unknown id and `Locked` until the patient has been unlocked
    /// by a spend or a contribution.
    pub fn view_history(&self, patient_id: &PatientId) -> ClinicResult<Vec<&HistoryEntry>> {
        self.require_patient(patient_id)?;
        if !self.ledger.is_unlocked(patient_id) {
            return Err(ClinicError::Locked(patient_id.clone()));
        }
        Ok(self.registry.history_for(patient_id))
    }

    pub fn report(&self, patient_id: &PatientId) -> ClinicResult<String> {
        let entries = self.view_history(patient_id)?;
        let patient = self.require_patient(patient_id)?;
        Ok(render_text_report(patient, &entries))
    }

    /// Validates and submits a form. The saved draft is cleared once the contribution lands.
    pub fn submit_form(&mut self, form: &ContributionForm) -> ClinicResult<Recorded> {
        let request = ContributionRequest::try_from(form)?;
        self.submit(request)
    }

    pub fn submit(&mut self, request: ContributionRequest) -> ClinicResult<Recorded> {
        let recorded = self
            .recorder
            .submit(&mut self.ledger, &mut self.registry, request)?;
        if let Err(e) = self.drafts.clear() {
            tracing::warn!("contribution recorded but draft was not cleared: {}", e);
        }
        Ok(recorded)
    }

    pub fn summary(&self) -> AccountSummary {
        let account = self.ledger.account();
        AccountSummary {
            clinic_name: self.cfg.clinic_name().to_string(),
            clinic_id: self.cfg.clinic_id().to_string(),
            credits: account.credit_balance,
            contribution_count: account.contribution_count,
            unlocked_count: account.unlocked_patient_ids.len(),
            opted_in: account.opted_in,
            expiry_status: self.ledger.expiry_status(),
            points_expiry: account.points_expiry,
        }
    }

    fn require_patient(&self, patient_id: &PatientId) -> ClinicResult<&Patient> {
        self.registry
            .patient(patient_id)
            .ok_or_else(|| ClinicError::PatientNotFound(patient_id.clone()))
    }
}
