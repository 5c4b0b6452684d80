//! Plain-text history report.
//!
//! The downloadable report is rendered from the patient record and its unlocked history
//! entries. Access control happens in the session, not here.

use crate::history::{HistoryEntry, Patient, Treatment};
use std::collections::BTreeSet;
use std::fmt::Write as _;

fn join_treatments(treatments: &BTreeSet<Treatment>) -> String {
    if treatments.is_empty() {
        return "None recorded".to_string();
    }
    treatments
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_tags(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        return "None recorded".to_string();
    }
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub fn render_text_report(patient: &Patient, entries: &[&HistoryEntry]) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "KINETIC NETWORK - CLINICAL HISTORY REPORT");
    let _ = writeln!(out, "=========================================");
    let _ = writeln!(out, "Patient: {} ({})", patient.name, patient.id);
    let _ = writeln!(out, "Date of Birth: {}", patient.dob_label());
    let _ = writeln!(out, "Last Visit: {}", patient.last_visit);

    if entries.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No verified history on the network for this patient.");
        return out;
    }

    for (index, entry) in entries.iter().enumerate() {
        let timeline_end = entry
            .timeline_end
            .map(|d| d.to_string())
            .unwrap_or_else(|| "Present".to_string());

        let _ = writeln!(out);
        let _ = writeln!(out, "[{}] {}", index + 1, entry.condition);
        let _ = writeln!(out, "  Status: {}", entry.status);
        let _ = writeln!(out, "  Timeline: {} to {}", entry.timeline_start, timeline_end);
        let _ = writeln!(
            out,
            "  Successful treatments: {}",
            join_treatments(&entry.successful_treatments)
        );
        let _ = writeln!(
            out,
            "  Unsuccessful treatments: {}",
            join_treatments(&entry.unsuccessful_treatments)
        );
        let _ = writeln!(
            out,
            "  Contraindications: {}",
            join_tags(&entry.contraindications)
        );
        let _ = writeln!(
            out,
            "  Recorded: {} by {}",
            entry.created_at.format("%Y-%m-%d"),
            entry.source_clinic_hash
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PatientRegistry;
    use kinetic_types::PatientId;

    #[test]
    fn test_report_interpolates_history_fields() {
        let registry = PatientRegistry::with_seed_data();
        let id = PatientId::new("P001").unwrap();
        let patient = registry.patient(&id).unwrap();
        let entries = registry.history_for(&id);

        let report = render_text_report(patient, &entries);

        assert!(report.contains("Patient: Sarah Jenkins (P001)"));
        assert!(report.contains("[1] Chronic Lower Back Pain"));
        assert!(report.contains("Status: Resolved"));
        assert!(report.contains("Timeline: 2023-01-10 to 2023-06-15"));
        assert!(report.contains("Successful treatments: Manual Therapy, Exercise Rehab"));
        assert!(report.contains("Contraindications: High-velocity manipulation, NSAIDS"));
        assert!(report.contains("Recorded: 2023-06-20 by CLINIC_XYZ_HASH"));
    }

    #[test]
    fn test_report_marks_ongoing_and_empty_history() {
        let registry = PatientRegistry::with_seed_data();

        let p002 = PatientId::new("P002").unwrap();
        let report = render_text_report(
            registry.patient(&p002).unwrap(),
            &registry.history_for(&p002),
        );
        assert!(report.contains("Timeline: 2023-11-01 to Present"));

        let p004 = PatientId::new("P004").unwrap();
        let empty = render_text_report(registry.patient(&p004).unwrap(), &[]);
        assert!(empty.contains("No verified history"));
    }
}
