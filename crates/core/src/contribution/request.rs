use super::form::ContributionForm;
use crate::error::ValidationError;
use crate::history::{Status, Treatment};
use chrono::NaiveDate;
use kinetic_types::{NonEmptyText, PatientId, TextError};
use std::collections::BTreeSet;

/// A contribution that passed the schema check.
///
/// Only the patient id, a condition label and a start date are required; every other field
/// is carried when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionRequest {
    pub patient_id: PatientId,
    pub patient_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub condition: NonEmptyText,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub status: Status,
    pub successful: BTreeSet<Treatment>,
    pub unsuccessful: BTreeSet<Treatment>,
    pub contraindications: BTreeSet<String>,
}

fn parse_date(field: &'static str, value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

impl TryFrom<&ContributionForm> for ContributionRequest {
    type Error = ValidationError;

    fn try_from(form: &ContributionForm) -> Result<Self, Self::Error> {
        let patient_id = PatientId::new(&form.patient_id).map_err(|e| match e {
            TextError::Empty => ValidationError::MissingPatientId,
            other => ValidationError::InvalidPatientId(other),
        })?;

        // The condition label falls back to the primary complaint classification.
        let condition = NonEmptyText::new(&form.condition)
            .or_else(|_| NonEmptyText::new(&form.primary_complaint))
            .map_err(|_| ValidationError::MissingCondition)?;

        let start = parse_date("start", &form.start)?.ok_or(ValidationError::MissingStart)?;
        let end = parse_date("end", &form.end)?;
        if let Some(end) = end {
            if end < start {
                return Err(ValidationError::EndBeforeStart { start, end });
            }
        }
        let dob = parse_date("dob", &form.dob)?;

        let patient_name = Some(form.patient_name.trim().to_string()).filter(|n| !n.is_empty());
        let contraindications = form
            .contraindications
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            patient_id,
            patient_name,
            dob,
            condition,
            start,
            end,
            status: form.status,
            successful: form.successful.iter().copied().collect(),
            unsuccessful: form.unsuccessful.iter().copied().collect(),
            contraindications,
        })
    }
}

impl TryFrom<ContributionForm> for ContributionRequest {
    type Error = ValidationError;

    fn try_from(form: ContributionForm) -> Result<Self, Self::Error> {
        ContributionRequest::try_from(&form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ContributionForm {
        ContributionForm {
            patient_id: "P010".into(),
            condition: "Knee Pain".into(),
            start: "2024-01-01".into(),
            ..ContributionForm::default()
        }
    }

    #[test]
    fn test_minimal_form_is_accepted() {
        let request = ContributionRequest::try_from(&minimal()).expect("minimal form is valid");

        assert_eq!(request.patient_id.as_str(), "P010");
        assert_eq!(request.condition.as_str(), "Knee Pain");
        assert_eq!(request.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(request.end, None);
        assert_eq!(request.patient_name, None);
        assert_eq!(request.status, Status::Ongoing);
    }

    #[test]
    fn test_missing_required_fields_are_rejected() {
        let no_id = ContributionForm {
            patient_id: "  ".into(),
            ..minimal()
        };
        assert_eq!(
            ContributionRequest::try_from(&no_id),
            Err(ValidationError::MissingPatientId)
        );

        let no_condition = ContributionForm {
            condition: String::new(),
            ..minimal()
        };
        assert_eq!(
            ContributionRequest::try_from(&no_condition),
            Err(ValidationError::MissingCondition)
        );

        let no_start = ContributionForm {
            start: String::new(),
            ..minimal()
        };
        assert_eq!(
            ContributionRequest::try_from(&no_start),
            Err(ValidationError::MissingStart)
        );
    }

    #[test]
    fn test_condition_falls_back_to_primary_complaint() {
        let form = ContributionForm {
            condition: String::new(),
            primary_complaint: "Shoulder Pain".into(),
            ..minimal()
        };

        let request = ContributionRequest::try_from(form).unwrap();
        assert_eq!(request.condition.as_str(), "Shoulder Pain");
    }

    #[test]
    fn test_bad_dates_are_rejected() {
        let bad_start = ContributionForm {
            start: "01/02/2024".into(),
            ..minimal()
        };
        assert!(matches!(
            ContributionRequest::try_from(&bad_start),
            Err(ValidationError::InvalidDate { field: "start", .. })
        ));

        let backwards = ContributionForm {
            end: "2023-12-31".into(),
            ..minimal()
        };
        assert!(matches!(
            ContributionRequest::try_from(&backwards),
            Err(ValidationError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_optional_fields_are_normalised() {
        let form = ContributionForm {
            patient_name: "  Alex Doe ".into(),
            dob: "1990-01-15".into(),
            successful: vec![Treatment::Taping, Treatment::Taping],
            contraindications: vec!["NSAIDS".into(), "  ".into(), " NSAIDS ".into()],
            ..minimal()
        };

        let request = ContributionRequest::try_from(&form).unwrap();
        assert_eq!(request.patient_name.as_deref(), Some("Alex Doe"));
        assert_eq!(request.dob, NaiveDate::from_ymd_opt(1990, 1, 15));
        assert_eq!(request.successful.len(), 1);
        assert_eq!(request.contraindications.len(), 1);
    }
}
