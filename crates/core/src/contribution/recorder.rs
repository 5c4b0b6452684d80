use super::request::ContributionRequest;
use super::transport::SubmissionTransport;
use crate::config::CoreConfig;
use crate::error::ContributionError;
use crate::history::HistoryEntry;
use crate::ledger::ClinicLedger;
use crate::registry::{PatientChange, PatientRegistry, PatientUpsert};
use kinetic_types::PatientId;
use kinetic_uuid::EntryId;

/// Result of a recorded contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub entry_id: EntryId,
    pub patient_id: PatientId,
    pub balance: u32,
    pub contribution_count: u32,
    pub patient_change: PatientChange,
}

/// Delivers contributions and applies their effects.
#[derive(Debug)]
pub struct ContributionRecorder<T> {
    transport: T,
    max_attempts: u32,
    source_clinic_hash: String,
}

impl<T: SubmissionTransport> ContributionRecorder<T> {
    pub fn new(transport: T, cfg: &CoreConfig) -> Self {
        Self {
            transport,
            max_attempts: cfg.submission_attempts().max(1),
            source_clinic_hash: cfg.source_clinic_hash().to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submits a validated contribution.
    ///
    /// Delivery is attempted up to the configured number of times before anything is
    /// mutated. Once it succeeds, all of the following are applied together:
    /// - a new [`HistoryEntry`] is appended to the registry
    /// - the patient is created as a placeholder or merged
    /// - the ledger earns one credit, counts the contribution, refreshes the expiry and
    ///   unlocks the patient for the contributor
    ///
    /// # Errors
    ///
    /// - [`ContributionError::NotOptedIn`] if the clinic has not opted in
    /// - [`ContributionError::TransientSubmissionFailure`] if every delivery attempt failed;
    ///   the ledger and registry are untouched and the caller may retry
    pub fn submit(
        &mut self,
        ledger: &mut ClinicLedger,
        registry: &mut PatientRegistry,
        request: ContributionRequest,
    ) -> Result<Recorded, ContributionError> {
        if !ledger.account().opted_in {
            return Err(ContributionError::NotOptedIn);
        }

        self.deliver(&request)?;

        let now = ledger.now();
        let entry = HistoryEntry {
            id: EntryId::new(),
            patient_id: request.patient_id.clone(),
            condition: request.condition,
            timeline_start: request.start,
            timeline_end: request.end,
            status: request.status,
            successful_treatments: request.successful,
            unsuccessful_treatments: request.unsuccessful,
            contraindications: request.contraindications,
            created_at: now,
            source_clinic_hash: self.source_clinic_hash.clone(),
        };
        let entry_id = entry.id;
        registry.append_history(entry);

        let patient_change = registry.upsert_patient(PatientUpsert {
            id: request.patient_id.clone(),
            name: request.patient_name,
            dob: request.dob,
            visit_date: now.date_naive(),
        });

        let balance = ledger.credit_contribution(&request.patient_id);
        let contribution_count = ledger.account().contribution_count;

        tracing::info!(
            "contribution {} recorded for {}: balance={} contributions={}",
            entry_id,
            request.patient_id,
            balance,
            contribution_count
        );

        Ok(Recorded {
            entry_id,
            patient_id: request.patient_id,
            balance,
            contribution_count,
            patient_change,
        })
    }

    fn deliver(&mut self, request: &ContributionRequest) -> Result<(), ContributionError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.transport.deliver(request) {
                Ok(()) => return Ok(()),
                Err(reason) if attempts >= self.max_attempts => {
                    tracing::warn!(
                        "giving up on contribution for {} after {} attempt(s): {}",
                        request.patient_id,
                        attempts,
                        reason
                    );
                    return Err(ContributionError::TransientSubmissionFailure { attempts, reason });
                }
                Err(reason) => {
                    tracing::warn!(
                        "delivery attempt {} for {} failed: {}",
                        attempts,
                        request.patient_id,
                        reason
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::contribution::{ContributionForm, ScriptedTransport};
    use crate::error::TransportError;
    use crate::ledger::ClinicAccount;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn pid(id: &str) -> PatientId {
        PatientId::new(id).unwrap()
    }

    fn ledger(opted_in: bool, credits: u32) -> ClinicLedger {
        ClinicLedger::from_account(
            ClinicAccount {
                credit_balance: credits,
                opted_in,
                has_received_initial_bonus: true,
                ..ClinicAccount::default()
            },
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(now())),
        )
    }

    fn knee_pain(patient_id: &str) -> ContributionRequest {
        ContributionRequest::try_from(ContributionForm {
            patient_id: patient_id.into(),
            condition: "Knee Pain".into(),
            start: "2024-01-01".into(),
            ..ContributionForm::default()
        })
        .unwrap()
    }

    fn recorder(transport: ScriptedTransport) -> ContributionRecorder<ScriptedTransport> {
        ContributionRecorder::new(transport, &CoreConfig::default())
    }

    #[test]
    fn test_submit_applies_full_effect_set() {
        let mut ledger = ledger(true, 3);
        let mut registry = PatientRegistry::with_seed_data();
        let mut recorder = recorder(ScriptedTransport::default());

        let recorded = recorder
            .submit(&mut ledger, &mut registry, knee_pain("P010"))
            .expect("submit should succeed");

        assert_eq!(recorded.balance, 4);
        assert_eq!(recorded.contribution_count, 1);
        assert_eq!(recorded.patient_change, PatientChange::Created);

        let account = ledger.account();
        assert_eq!(account.credit_balance, 4);
        assert!(account.unlocked_patient_ids.contains(&pid("P010")));
        assert_eq!(account.points_expiry, Some(now() + Duration::days(30)));

        let history = registry.history_for(&pid("P010"));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, recorded.entry_id);
        assert_eq!(history[0].created_at, now());
        assert_eq!(history[0].source_clinic_hash, "RIVERSDALE_PHYSIO");

        let patient = registry.patient(&pid("P010")).unwrap();
        assert_eq!(patient.name, "Patient P010");
        assert_eq!(patient.last_visit, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_submit_requires_opt_in_and_changes_nothing() {
        let mut ledger = ledger(false, 3);
        let mut registry = PatientRegistry::with_seed_data();
        let mut recorder = recorder(ScriptedTransport::default());

        let err = recorder
            .submit(&mut ledger, &mut registry, knee_pain("P001"))
            .expect_err("should require opt-in");

        assert_eq!(err, ContributionError::NotOptedIn);
        assert_eq!(recorder.transport().deliveries(), 0);
        assert_eq!(ledger.account().credit_balance, 3);
        assert_eq!(registry.history_len(), 2);
    }

    #[test]
    fn test_transient_failure_is_retried() {
        let mut ledger = ledger(true, 0);
        let mut registry = PatientRegistry::new();
        let mut recorder = recorder(ScriptedTransport::failing(2));

        let recorded = recorder
            .submit(&mut ledger, &mut registry, knee_pain("P001"))
            .expect("third attempt should succeed");

        assert_eq!(recorder.transport().deliveries(), 3);
        assert_eq!(recorded.balance, 1);
    }

    #[test]
    fn test_exhausted_retries_commit_nothing() {
        let mut ledger = ledger(true, 2);
        let mut registry = PatientRegistry::with_seed_data();
        let mut recorder = recorder(ScriptedTransport::failing(3));

        let err = recorder
            .submit(&mut ledger, &mut registry, knee_pain("P010"))
            .expect_err("all attempts fail");

        assert_eq!(
            err,
            ContributionError::TransientSubmissionFailure {
                attempts: 3,
                reason: TransportError::Timeout,
            }
        );
        let account = ledger.account();
        assert_eq!(account.credit_balance, 2);
        assert_eq!(account.contribution_count, 0);
        assert!(account.unlocked_patient_ids.is_empty());
        assert!(registry.patient(&pid("P010")).is_none());
        assert_eq!(registry.history_len(), 2);

        // The same request goes through once the transport recovers.
        let recorded = recorder
            .submit(&mut ledger, &mut registry, knee_pain("P010"))
            .expect("retry should succeed");
        assert_eq!(recorded.balance, 3);
    }

    #[test]
    fn test_submit_merges_existing_patient() {
        let mut ledger = ledger(true, 0);
        let mut registry = PatientRegistry::with_seed_data();
        let mut recorder = recorder(ScriptedTransport::default());
        let mut request = knee_pain("P003");
        request.patient_name = Some("David R. Smith".into());

        let recorded = recorder.submit(&mut ledger, &mut registry, request).unwrap();

        assert_eq!(recorded.patient_change, PatientChange::Updated);
        let patient = registry.patient(&pid("P003")).unwrap();
        assert_eq!(patient.name, "David R. Smith");
        assert!(patient.history_available);
    }
}
