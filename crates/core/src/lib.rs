//! # Kinetic Core
//!
//! Core business logic for the Kinetic Network clinic ledger.
//!
//! This crate holds the domain rules and their persistence:
//! - Credit ledger and consent state machine ([`ClinicLedger`])
//! - Contribution validation, delivery with retry, and its atomic effect set
//! - Expiry policy for earned credits
//! - Patient registry with seed data, the unlock gate and text reports
//! - Debounced draft autosave
//! - A key/value persistence gateway (in-memory or a JSON file)
//!
//! **No presentation concerns**: prompts, rendering and process setup belong in `kinetic-cli`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod contribution;
pub mod draft;
pub mod error;
pub mod expiry;
pub mod history;
pub mod ledger;
pub mod registry;
pub mod report;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use contribution::{
    ContributionForm, ContributionRecorder, ContributionRequest, FormStep, Recorded,
    ScriptedTransport, SimulatedTransport, SubmissionTransport,
};
pub use draft::DraftAutosave;
pub use error::{
    ClinicError, ClinicResult, ContributionError, LedgerError, StoreError, TransportError,
    ValidationError,
};
pub use expiry::ExpiryStatus;
pub use history::{HistoryEntry, Patient, Status, Treatment};
pub use ledger::{ClinicAccount, ClinicLedger, OptInOutcome, UnlockOutcome};
pub use registry::{PatientChange, PatientRegistry};
pub use session::{AccountSummary, ClinicSession};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

pub use kinetic_types::{NonEmptyText, PatientId, TextError};
pub use kinetic_uuid::EntryId;
