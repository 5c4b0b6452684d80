//! Identifiers for contributed history entries.
//!
//! Every [`EntryId`] has one canonical textual form: the prefix `H-` followed by
//! **32 lowercase hexadecimal characters** (a v4 UUID in simple form), for example
//! `H-550e8400e29b41d4a716446655440000`.
//!
//! - [`EntryId::new`] allocates a fresh identifier for a new contribution.
//! - [`EntryId::parse`] accepts only the canonical form; uppercase, hyphenated UUIDs or a
//!   missing prefix are rejected rather than normalised.

mod entry_id;

pub use entry_id::{EntryId, Uuid, ENTRY_ID_PREFIX};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
