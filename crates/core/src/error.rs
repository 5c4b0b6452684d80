use kinetic_types::{PatientId, TextError};

/// Reasons a spend against the ledger is refused.
///
/// All variants are recoverable: the account is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("opt in to the Kinetic Network to use credits")]
    NotOptedIn,
    #[error("insufficient credits: contribute a patient history to earn more")]
    InsufficientCredits,
    #[error("credits have expired: contribute a patient history to refresh them")]
    Expired,
}

/// A contribution failed its schema check. Nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Patient ID is required.")]
    MissingPatientId,
    #[error("invalid patient id: {0}")]
    InvalidPatientId(TextError),
    #[error("Condition is required.")]
    MissingCondition,
    #[error("Start date is required.")]
    MissingStart,
    #[error("invalid {field} date '{value}': expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    /// A multi-step form check failed; carries the inline message for that step.
    #[error("{0}")]
    Step(&'static str),
}

/// The submission transport could not deliver a contribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network connection timed out. Please try again.")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContributionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("opt in to the Kinetic Network to contribute")]
    NotOptedIn,
    /// Every delivery attempt failed. The contribution may be retried; no state was committed.
    #[error("submission failed after {attempts} attempt(s): {reason}")]
    TransientSubmissionFailure {
        attempts: u32,
        reason: TransportError,
    },
}

/// Failures of the key/value persistence gateway.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store: {0}")]
    Read(std::io::Error),
    #[error("failed to write store: {0}")]
    Write(std::io::Error),
    #[error("store contents are corrupt: {0}")]
    Corrupt(serde_json::Error),
    #[error("failed to serialize store: {0}")]
    Serialization(serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Contribution(#[from] ContributionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize draft: {0}")]
    Draft(serde_json::Error),
    #[error("patient {0} not found")]
    PatientNotFound(PatientId),
    #[error("history for patient {0} is locked: unlock it first")]
    Locked(PatientId),
}

impl From<ValidationError> for ClinicError {
    fn from(err: ValidationError) -> Self {
        ClinicError::Contribution(ContributionError::Validation(err))
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
