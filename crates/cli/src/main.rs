use anyhow::Context;
use clap::{Parser, Subcommand};
use kinetic_core::config::{
    attempts_from_env_value, debounce_from_env_value, failure_rate_from_env_value,
    text_from_env_value,
};
use kinetic_core::constants::{
    DEFAULT_CLINIC_ID, DEFAULT_CLINIC_NAME, DEFAULT_DATA_FILE, DEFAULT_SOURCE_CLINIC_HASH,
};
use kinetic_core::{
    ClinicError, ClinicSession, ContributionForm, CoreConfig, ExpiryStatus, JsonFileStore,
    OptInOutcome, PatientId, SimulatedTransport, Status, SystemClock, Treatment, UnlockOutcome,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Session = ClinicSession<SimulatedTransport>;

#[derive(Parser)]
#[command(name = "kinetic")]
#[command(about = "Kinetic Network clinic ledger CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show credits, consent and expiry
    Status,
    /// Join the network (first time grants the welcome bonus)
    OptIn,
    /// Leave the network and forfeit held credits
    OptOut,
    /// List every patient in the registry
    Patients,
    /// Search patients by name or id
    Search {
        /// Search term (blank lists everyone)
        #[arg(default_value = "")]
        term: String,
    },
    /// Spend one credit to unlock a patient's history
    Unlock {
        /// Patient id, e.g. P001
        patient_id: PatientId,
    },
    /// Show an unlocked patient's history
    History {
        /// Patient id
        patient_id: PatientId,
    },
    /// Print the text report for an unlocked patient
    Report {
        /// Patient id
        patient_id: PatientId,
    },
    /// Contribute a history entry and earn a credit
    Contribute {
        #[arg(long)]
        patient_id: String,
        #[arg(long)]
        condition: String,
        /// Timeline start (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Timeline end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "ongoing")]
        status: Status,
        /// Patient name, used when the patient is new to the registry
        #[arg(long)]
        name: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        successful: Vec<Treatment>,
        #[arg(long)]
        unsuccessful: Vec<Treatment>,
        #[arg(long = "contraindication")]
        contraindications: Vec<String>,
        /// Save the form as the draft instead of submitting it
        #[arg(long)]
        save_draft: bool,
    },
    /// Show the saved contribution draft
    Draft,
    /// Discard the saved contribution draft
    ResetDraft,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kinetic=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut session = open_session()?;

    match cli.command {
        Some(command) => run(&mut session, command)?,
        None => shell(&mut session)?,
    }

    if let Err(e) = session.drafts_mut().flush_now() {
        tracing::warn!("failed to save draft on exit: {}", e);
    }
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let cfg = CoreConfig::new(
        text_from_env_value(env_value("KINETIC_CLINIC_NAME"), DEFAULT_CLINIC_NAME)?,
        text_from_env_value(env_value("KINETIC_CLINIC_ID"), DEFAULT_CLINIC_ID)?,
        text_from_env_value(env_value("KINETIC_SOURCE_HASH"), DEFAULT_SOURCE_CLINIC_HASH)?,
        debounce_from_env_value(env_value("KINETIC_DRAFT_DEBOUNCE_MS"))?,
        attempts_from_env_value(env_value("KINETIC_SUBMISSION_ATTEMPTS"))?,
        failure_rate_from_env_value(env_value("KINETIC_FAILURE_RATE"))?,
    )?;
    Ok(cfg)
}

fn open_session() -> anyhow::Result<Session> {
    let cfg = config_from_env()?;
    let data_file = env_value("KINETIC_DATA_FILE")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string());

    let store = JsonFileStore::open(&data_file)
        .with_context(|| format!("failed to open data file {}", data_file))?;
    let transport = SimulatedTransport::new(cfg.simulated_failure_rate())?;

    tracing::info!(
        "starting session for {} ({}) with data file {}",
        cfg.clinic_name(),
        cfg.clinic_id(),
        store.path().display()
    );
    Ok(ClinicSession::load(
        cfg,
        Arc::new(store),
        Arc::new(SystemClock),
        transport,
    )?)
}

fn run(session: &mut Session, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Status => print_status(session),
        Commands::OptIn => match session.opt_in() {
            OptInOutcome::FirstTimeBonus {
                balance,
                expires_at,
            } => println!(
                "Welcome to the network. {} credits granted, valid until {}.",
                balance,
                expires_at.format("%Y-%m-%d")
            ),
            OptInOutcome::Restored { balance } => {
                println!("Welcome back. Balance: {} credits.", balance)
            }
        },
        Commands::OptOut => {
            session.opt_out();
            println!("Opted out. Credits forfeited.");
        }
        Commands::Patients => {
            for patient in session.patients() {
                print_patient(session, patient);
            }
        }
        Commands::Search { term } => {
            let results = session.search(&term);
            if results.is_empty() {
                println!("No patients match '{}'.", term);
            }
            for patient in results {
                print_patient(session, patient);
            }
        }
        Commands::Unlock { patient_id } => match session.unlock(&patient_id) {
            Ok(UnlockOutcome::Unlocked { balance }) => {
                println!("Unlocked {}. Balance: {} credits.", patient_id, balance)
            }
            Ok(UnlockOutcome::AlreadyUnlocked) => println!("{} is already unlocked.", patient_id),
            Err(e) => report_failure(e),
        },
        Commands::History { patient_id } => match session.view_history(&patient_id) {
            Ok(entries) if entries.is_empty() => {
                println!("No verified history on the network for {}.", patient_id)
            }
            Ok(entries) => {
                for entry in entries {
                    let end = entry
                        .timeline_end
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "Present".to_string());
                    println!(
                        "{}  {}  [{}]  {} to {}  ({})",
                        entry.id,
                        entry.condition,
                        entry.status,
                        entry.timeline_start,
                        end,
                        entry.source_clinic_hash
                    );
                }
            }
            Err(e) => report_failure(e),
        },
        Commands::Report { patient_id } => match session.report(&patient_id) {
            Ok(report) => print!("{}", report),
            Err(e) => report_failure(e),
        },
        Commands::Contribute {
            patient_id,
            condition,
            start,
            end,
            status,
            name,
            dob,
            successful,
            unsuccessful,
            contraindications,
            save_draft,
        } => {
            let form = ContributionForm {
                patient_id,
                patient_name: name.unwrap_or_default(),
                dob: dob.unwrap_or_default(),
                condition,
                start,
                end: end.unwrap_or_default(),
                status,
                successful,
                unsuccessful,
                contraindications,
                ..ContributionForm::default()
            };

            if let Some(note) = incomplete_step_note(&form) {
                eprintln!("Note: {}", note);
            }

            if save_draft {
                session.drafts_mut().record_edit(form);
                session.drafts_mut().flush_now()?;
                println!("Draft saved.");
                return Ok(());
            }

            match session.submit_form(&form) {
                Ok(recorded) => println!(
                    "Contribution {} recorded for {}. Balance: {} credits ({} contributions).",
                    recorded.entry_id,
                    recorded.patient_id,
                    recorded.balance,
                    recorded.contribution_count
                ),
                Err(e) => {
                    // Keep what was typed so it can be resubmitted.
                    session.drafts_mut().record_edit(form);
                    report_failure(e);
                }
            }
        }
        Commands::Draft => match session.drafts_mut().load()? {
            Some(form) => {
                println!("Patient: {}", form.patient_id);
                println!("Condition: {}", form.condition);
                println!("Start: {}", form.start);
                if !form.end.is_empty() {
                    println!("End: {}", form.end);
                }
                println!("Status: {}", form.status);
                match incomplete_step_note(&form) {
                    Some(note) => println!("{}", note),
                    None => println!("All form steps complete."),
                }
            }
            None => println!("No saved draft."),
        },
        Commands::ResetDraft => {
            session.drafts_mut().clear()?;
            println!("Draft discarded.");
        }
    }

    Ok(())
}

fn print_status(session: &Session) {
    let summary = session.summary();
    println!("{} ({})", summary.clinic_name, summary.clinic_id);
    println!(
        "Network: {}",
        if summary.opted_in {
            "opted in"
        } else {
            "opted out"
        }
    );
    println!("Credits: {}", summary.credits);
    println!("Contributions: {}", summary.contribution_count);
    println!("Unlocked records: {}", summary.unlocked_count);
    match (summary.expiry_status, summary.points_expiry) {
        (ExpiryStatus::Active, Some(expiry)) => {
            println!("Credits valid until {}", expiry.format("%Y-%m-%d"))
        }
        (ExpiryStatus::Expired, Some(expiry)) => {
            println!("Credits expired on {}", expiry.format("%Y-%m-%d"))
        }
        (_, None) => {}
    }
}

fn print_patient(session: &Session, patient: &kinetic_core::Patient) {
    let access = if session.ledger().is_unlocked(&patient.id) {
        "unlocked"
    } else if patient.history_available {
        "locked"
    } else {
        "no history"
    };
    println!(
        "{}  {}  DOB {}  last visit {}  [{}]",
        patient.id,
        patient.name,
        patient.dob_label(),
        patient.last_visit,
        access
    );
}

/// Names the first form step still missing a required field, as the full form would on submit.
fn incomplete_step_note(form: &ContributionForm) -> Option<String> {
    form.validate_all()
        .err()
        .map(|(step, err)| format!("{} step incomplete: {}", step, err))
}

fn report_failure(err: ClinicError) {
    eprintln!("Error: {}", err);
}

fn shell(session: &mut Session) -> anyhow::Result<()> {
    println!("Kinetic Network shell. Type 'help' for commands, 'quit' to exit.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("kinetic> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let words = split_words(&line);
        match words.first().map(String::as_str) {
            None => {}
            Some("quit") | Some("exit") => break,
            Some(_) => {
                let args = std::iter::once("kinetic".to_string()).chain(words);
                match Cli::try_parse_from(args) {
                    Ok(Cli {
                        command: Some(command),
                    }) => {
                        if let Err(e) = run(session, command) {
                            eprintln!("Error: {:#}", e);
                        }
                    }
                    Ok(Cli { command: None }) => {}
                    Err(e) => {
                        let _ = e.print();
                    }
                }
            }
        }

        if let Err(e) = session.drafts_mut().flush_due() {
            tracing::warn!("failed to autosave draft: {}", e);
        }
    }

    Ok(())
}

/// Splits a shell line on whitespace, keeping single- or double-quoted runs together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_keeps_quoted_runs() {
        assert_eq!(
            split_words(r#"contribute --patient-id P010 --condition "Knee Pain" --start 2024-01-01"#),
            vec![
                "contribute",
                "--patient-id",
                "P010",
                "--condition",
                "Knee Pain",
                "--start",
                "2024-01-01"
            ]
        );
        assert_eq!(split_words("  search  ''  "), vec!["search", ""]);
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn test_incomplete_step_note_names_first_failing_step() {
        let bare = ContributionForm {
            patient_id: "P010".into(),
            condition: "Knee Pain".into(),
            start: "2024-01-01".into(),
            ..ContributionForm::default()
        };
        assert_eq!(
            incomplete_step_note(&bare).as_deref(),
            Some("Patient Demographics step incomplete: Patient Name is required.")
        );

        let needs_assessment = ContributionForm {
            patient_name: "Tom Hardy".into(),
            dob: "1980-05-05".into(),
            primary_complaint: "Knee Pain".into(),
            injury_description: "Twisted during football".into(),
            ..bare.clone()
        };
        assert_eq!(
            incomplete_step_note(&needs_assessment).as_deref(),
            Some("Assessment step incomplete: Clinical assessment/opinion is required.")
        );

        let complete = ContributionForm {
            clinical_opinion: "Mild MCL sprain".into(),
            ..needs_assessment
        };
        assert_eq!(incomplete_step_note(&complete), None);
    }

    #[test]
    fn test_contribute_parses_treatments_and_status() {
        let cli = Cli::try_parse_from([
            "kinetic",
            "contribute",
            "--patient-id",
            "P010",
            "--condition",
            "Knee Pain",
            "--start",
            "2024-01-01",
            "--status",
            "resolved",
            "--successful",
            "manual-therapy",
            "--successful",
            "exercise_rehab",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Contribute {
                status, successful, ..
            }) => {
                assert_eq!(status, Status::Resolved);
                assert_eq!(
                    successful,
                    vec![Treatment::ManualTherapy, Treatment::ExerciseRehab]
                );
            }
            _ => panic!("expected contribute"),
        }
    }
}
