//! Patient and history-entry records.

use crate::constants::UNKNOWN_DOB_LABEL;
use chrono::{DateTime, NaiveDate, Utc};
use kinetic_types::{NonEmptyText, PatientId};
use kinetic_uuid::EntryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of a treatment course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Resolved,
    #[default]
    Ongoing,
    Plateaued,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Resolved, Status::Ongoing, Status::Plateaued];

    pub fn label(self) -> &'static str {
        match self {
            Status::Resolved => "Resolved",
            Status::Ongoing => "Ongoing",
            Status::Plateaued => "Plateaued",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Treatment {
    #[serde(rename = "Manual Therapy")]
    ManualTherapy,
    #[serde(rename = "Dry Needling")]
    DryNeedling,
    #[serde(rename = "Exercise Rehab")]
    ExerciseRehab,
    #[serde(rename = "Ultrasound")]
    Ultrasound,
    #[serde(rename = "Taping")]
    Taping,
    #[serde(rename = "Manipulation")]
    Manipulation,
}

impl Treatment {
    pub const ALL: [Treatment; 6] = [
        Treatment::ManualTherapy,
        Treatment::DryNeedling,
        Treatment::ExerciseRehab,
        Treatment::Ultrasound,
        Treatment::Taping,
        Treatment::Manipulation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Treatment::ManualTherapy => "Manual Therapy",
            Treatment::DryNeedling => "Dry Needling",
            Treatment::ExerciseRehab => "Exercise Rehab",
            Treatment::Ultrasound => "Ultrasound",
            Treatment::Taping => "Taping",
            Treatment::Manipulation => "Manipulation",
        }
    }
}

impl fmt::Display for Treatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Treatment {
    type Err = String;

    /// Accepts the display label in any case, with `-` or `_` standing in for spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        Treatment::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown treatment '{}'", s))
    }
}

/// Structured contraindication tags offered by the contribution form.
pub const CONTRAINDICATIONS: [&str; 7] = [
    "High-velocity manipulation",
    "NSAIDS",
    "Ice/Cold Therapy",
    "Heat Therapy",
    "Electrical Stimulation",
    "Specific Loading",
    "Cervical Traction",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub last_visit: NaiveDate,
    pub history_available: bool,
}

impl Patient {
    /// Date of birth for display; unknown when a patient was created from a bare contribution.
    pub fn dob_label(&self) -> String {
        self.dob
            .map(|d| d.to_string())
            .unwrap_or_else(|| UNKNOWN_DOB_LABEL.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub patient_id: PatientId,
    pub condition: NonEmptyText,
    pub timeline_start: NaiveDate,
    pub timeline_end: Option<NaiveDate>,
    pub status: Status,
    pub successful_treatments: BTreeSet<Treatment>,
    pub unsuccessful_treatments: BTreeSet<Treatment>,
    pub contraindications: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Anonymised tag of the contributing clinic.
    pub source_clinic_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_parses_loose_labels() {
        assert_eq!("dry-needling".parse::<Treatment>(), Ok(Treatment::DryNeedling));
        assert_eq!("Exercise Rehab".parse::<Treatment>(), Ok(Treatment::ExerciseRehab));
        assert_eq!("manual_therapy".parse::<Treatment>(), Ok(Treatment::ManualTherapy));
        assert!("acupuncture".parse::<Treatment>().is_err());
    }

    #[test]
    fn test_treatment_serialises_as_label() {
        let json = serde_json::to_string(&Treatment::ExerciseRehab).unwrap();
        assert_eq!(json, "\"Exercise Rehab\"");
    }

    #[test]
    fn test_status_defaults_to_ongoing() {
        assert_eq!(Status::default(), Status::Ongoing);
        assert_eq!("plateaued".parse::<Status>(), Ok(Status::Plateaued));
    }

    #[test]
    fn test_dob_label_falls_back_to_unknown() {
        let patient = Patient {
            id: PatientId::new("P010").unwrap(),
            name: "Patient P010".into(),
            dob: None,
            last_visit: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            history_available: true,
        };
        assert_eq!(patient.dob_label(), "Unknown");
    }
}
