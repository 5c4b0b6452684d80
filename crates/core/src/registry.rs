//! Patient registry.
//!
//! Holds the patients visible to this clinic and every history entry contributed on the
//! network. The registry knows nothing about credits; access to entries is gated by the
//! session against the ledger's unlock set.

use crate::history::{HistoryEntry, Patient, Status, Treatment};
use chrono::{NaiveDate, NaiveTime};
use kinetic_types::{NonEmptyText, PatientId};
use kinetic_uuid::EntryId;
use std::collections::BTreeSet;

/// Patient fields supplied alongside a contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientUpsert {
    pub id: PatientId,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    /// Used as `last_visit` when a placeholder record is created.
    pub visit_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientChange {
    Created,
    Updated,
}

#[derive(Debug, Clone, Default)]
pub struct PatientRegistry {
    patients: Vec<Patient>,
    history: Vec<HistoryEntry>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the demonstration patients (P001-P004) and their histories.
    pub fn with_seed_data() -> Self {
        let mut registry = Self::new();
        for (id, name, dob, last_visit, history_available) in [
            ("P001", "Sarah Jenkins", (1985, 4, 12), (2023, 10, 15), true),
            ("P002", "Michael Chen", (1990, 8, 22), (2024, 1, 10), true),
            ("P003", "David Smith", (1978, 11, 3), (2024, 2, 1), false),
            ("P004", "Emma Wilson", (1995, 2, 14), (2023, 12, 5), true),
        ] {
            let Ok(id) = PatientId::new(id) else {
                continue;
            };
            registry.patients.push(Patient {
                id,
                name: name.to_string(),
                dob: Some(seed_date(dob)),
                last_visit: seed_date(last_visit),
                history_available,
            });
        }

        registry.extend_seed_history(
            "P001",
            "Chronic Lower Back Pain",
            ((2023, 1, 10), Some((2023, 6, 15))),
            Status::Resolved,
            [Treatment::ExerciseRehab, Treatment::ManualTherapy].into(),
            [Treatment::Ultrasound, Treatment::Taping].into(),
            &["High-velocity manipulation", "NSAIDS"],
            (2023, 6, 20),
            "CLINIC_XYZ_HASH",
        );
        registry.extend_seed_history(
            "P002",
            "Rotator Cuff Tendinopathy",
            ((2023, 11, 1), None),
            Status::Ongoing,
            [Treatment::DryNeedling].into(),
            [Treatment::ExerciseRehab].into(),
            &["Overhead loading"],
            (2024, 1, 15),
            "CLINIC_ABC_HASH",
        );

        registry
    }

    #[allow(clippy::too_many_arguments)]
    fn extend_seed_history(
        &mut self,
        patient_id: &str,
        condition: &str,
        timeline: ((i32, u32, u32), Option<(i32, u32, u32)>),
        status: Status,
        successful: BTreeSet<Treatment>,
        unsuccessful: BTreeSet<Treatment>,
        contraindications: &[&str],
        created: (i32, u32, u32),
        source: &str,
    ) {
        let (Ok(patient_id), Ok(condition)) =
            (PatientId::new(patient_id), NonEmptyText::new(condition))
        else {
            return;
        };
        self.history.push(HistoryEntry {
            id: EntryId::new(),
            patient_id,
            condition,
            timeline_start: seed_date(timeline.0),
            timeline_end: timeline.1.map(seed_date),
            status,
            successful_treatments: successful,
            unsuccessful_treatments: unsuccessful,
            contraindications: contraindications.iter().map(|c| c.to_string()).collect(),
            created_at: seed_date(created).and_time(NaiveTime::MIN).and_utc(),
            source_clinic_hash: source.to_string(),
        });
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn patient(&self, id: &PatientId) -> Option<&Patient> {
        self.patients.iter().find(|p| &p.id == id)
    }

    /// Case-insensitive substring match on name or id. A blank term matches everyone.
    pub fn search(&self, term: &str) -> Vec<&Patient> {
        let needle = term.trim().to_lowercase();
        self.patients
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.id.as_str().to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn history_for(&self, id: &PatientId) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| &h.patient_id == id).collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub(crate) fn append_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Creates a placeholder patient when `upsert.id` is unknown, otherwise merges the supplied
    /// name and date of birth. Either way the patient ends up with history available.
    pub fn upsert_patient(&mut self, upsert: PatientUpsert) -> PatientChange {
        let name = upsert
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if let Some(existing) = self.patients.iter_mut().find(|p| p.id == upsert.id) {
            if let Some(name) = name {
                existing.name = name;
            }
            if upsert.dob.is_some() {
                existing.dob = upsert.dob;
            }
            existing.history_available = true;
            return PatientChange::Updated;
        }

        let name = name.unwrap_or_else(|| format!("Patient {}", upsert.id));
        self.patients.push(Patient {
            id: upsert.id,
            name,
            dob: upsert.dob,
            last_visit: upsert.visit_date,
            history_available: true,
        });
        PatientChange::Created
    }
}

fn seed_date((year, month, day): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> PatientId {
        PatientId::new(id).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_seed_data_matches_demo_records() {
        let registry = PatientRegistry::with_seed_data();

        assert_eq!(registry.patients().len(), 4);
        assert_eq!(registry.history_len(), 2);
        let p003 = registry.patient(&pid("P003")).expect("P003 should exist");
        assert!(!p003.history_available);
        assert_eq!(registry.history_for(&pid("P001")).len(), 1);
        assert!(registry.history_for(&pid("P004")).is_empty());
    }

    #[test]
    fn test_search_matches_name_or_id_case_insensitively() {
        let registry = PatientRegistry::with_seed_data();

        let by_name: Vec<_> = registry.search("jenK").iter().map(|p| p.id.clone()).collect();
        assert_eq!(by_name, vec![pid("P001")]);

        let by_id: Vec<_> = registry.search("p00").iter().map(|p| p.id.clone()).collect();
        assert_eq!(by_id.len(), 4);

        assert!(registry.search("zzz").is_empty());
        assert_eq!(registry.search("   ").len(), 4);
    }

    #[test]
    fn test_upsert_creates_placeholder_for_unknown_patient() {
        let mut registry = PatientRegistry::with_seed_data();

        let change = registry.upsert_patient(PatientUpsert {
            id: pid("P010"),
            name: Some("  ".into()),
            dob: None,
            visit_date: today(),
        });

        assert_eq!(change, PatientChange::Created);
        let patient = registry.patient(&pid("P010")).unwrap();
        assert_eq!(patient.name, "Patient P010");
        assert_eq!(patient.dob_label(), "Unknown");
        assert_eq!(patient.last_visit, today());
        assert!(patient.history_available);
    }

    #[test]
    fn test_upsert_merges_existing_patient() {
        let mut registry = PatientRegistry::with_seed_data();
        let dob = NaiveDate::from_ymd_opt(1978, 11, 4).unwrap();

        let change = registry.upsert_patient(PatientUpsert {
            id: pid("P003"),
            name: None,
            dob: Some(dob),
            visit_date: today(),
        });

        assert_eq!(change, PatientChange::Updated);
        let patient = registry.patient(&pid("P003")).unwrap();
        assert_eq!(patient.name, "David Smith");
        assert_eq!(patient.dob, Some(dob));
        assert!(patient.history_available);
        assert_eq!(
            patient.last_visit,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(registry.patients().len(), 4);
    }
}
