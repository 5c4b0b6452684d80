//! Contribution recording.
//!
//! A contribution travels through three stages:
//! 1. [`ContributionForm`], the loosely-filled draft the presentation layer edits and autosaves
//! 2. [`ContributionRequest`], the schema-checked value built from a form at the boundary
//! 3. [`ContributionRecorder::submit`], which delivers the request and, only once delivery
//!    succeeds, applies the full effect set to the ledger and registry

mod form;
mod recorder;
mod request;
mod transport;

pub use form::{ContributionForm, FormStep};
pub use recorder::{ContributionRecorder, Recorded};
pub use request::ContributionRequest;
pub use transport::{ScriptedTransport, SimulatedTransport, SubmissionTransport};
