use crate::error::ValidationError;
use crate::history::{Status, Treatment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The progress-note form as entered, serialised verbatim as the autosaved draft.
///
/// Every field may be blank; nothing here is trusted until it becomes a
/// [`ContributionRequest`](super::ContributionRequest).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributionForm {
    // Patient demographics
    pub patient_id: String,
    pub patient_name: String,
    pub dob: String,

    // Subjective
    pub primary_complaint: String,
    pub injury_description: String,
    pub mechanism_of_injury: String,
    pub symptom_progression: String,
    pub patient_self_report: String,
    pub activity_level: String,
    pub disability_status: String,
    pub social_history: String,
    pub treatment_goals: String,
    pub prior_treatment_response: String,

    // Objective
    pub postural_observations: String,
    pub range_of_motion: String,
    pub strength_testing: String,
    pub functional_tests: String,
    pub specific_measurements: String,
    pub vital_signs: String,
    pub physical_exam_findings: String,
    pub investigation_results: String,

    // Assessment
    pub clinical_opinion: String,
    pub progress_changes: String,
    pub factors_affecting_progress: String,
    pub referrals_needed: String,
    pub treatment_response: String,
    pub patient_education: String,
    pub equipment_required: String,

    // Plan
    pub interventions: String,
    pub treatment_frequency: String,
    pub exercises_performed: String,
    pub patient_education_provided: String,

    // Classification and timeline
    pub condition: String,
    pub successful: Vec<Treatment>,
    pub unsuccessful: Vec<Treatment>,
    pub contraindications: Vec<String>,
    pub start: String,
    pub end: String,
    pub status: Status,
}

/// Pages of the multi-step form, each with its own required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    Demographics,
    Subjective,
    Assessment,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [
        FormStep::Demographics,
        FormStep::Subjective,
        FormStep::Assessment,
    ];

    pub fn next(self) -> Option<FormStep> {
        match self {
            FormStep::Demographics => Some(FormStep::Subjective),
            FormStep::Subjective => Some(FormStep::Assessment),
            FormStep::Assessment => None,
        }
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FormStep::Demographics => "Patient Demographics",
            FormStep::Subjective => "Subjective",
            FormStep::Assessment => "Assessment",
        };
        f.write_str(label)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl ContributionForm {
    /// Checks the fields the given page requires before the user may advance.
    pub fn validate_step(&self, step: FormStep) -> Result<(), ValidationError> {
        let missing = match step {
            FormStep::Demographics => {
                if blank(&self.patient_id) {
                    Some("Patient ID is required.")
                } else if blank(&self.patient_name) {
                    Some("Patient Name is required.")
                } else if blank(&self.dob) {
                    Some("Date of Birth is required.")
                } else {
                    None
                }
            }
            FormStep::Subjective => {
                if blank(&self.primary_complaint) {
                    Some("Primary Complaint is required.")
                } else if blank(&self.injury_description) {
                    Some("Detailed injury description is required.")
                } else {
                    None
                }
            }
            FormStep::Assessment => {
                blank(&self.clinical_opinion).then_some("Clinical assessment/opinion is required.")
            }
        };

        match missing {
            Some(message) => Err(ValidationError::Step(message)),
            None => Ok(()),
        }
    }

    /// Validates every page and reports the first failing step with its message.
    pub fn validate_all(&self) -> Result<(), (FormStep, ValidationError)> {
        for step in FormStep::ALL {
            self.validate_step(step).map_err(|e| (step, e))?;
        }
        Ok(())
    }
}
