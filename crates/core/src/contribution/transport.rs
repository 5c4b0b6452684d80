use super::request::ContributionRequest;
use crate::error::{ClinicError, ClinicResult, TransportError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Delivery step of a contribution submission.
///
/// Contributions have no real backend; this seam exists so the unreliable hop can be simulated
/// in the application and forced either way in tests.
pub trait SubmissionTransport {
    fn deliver(&mut self, request: &ContributionRequest) -> Result<(), TransportError>;
}

/// Fails a delivery with a fixed probability, modelling a flaky network.
#[derive(Debug)]
pub struct SimulatedTransport {
    failure_rate: f64,
    rng: StdRng,
}

impl SimulatedTransport {
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` unless `0.0 <= failure_rate <= 1.0`.
    pub fn new(failure_rate: f64) -> ClinicResult<Self> {
        Self::with_rng(failure_rate, StdRng::from_entropy())
    }

    /// Deterministic variant for reproducible runs.
    pub fn seeded(failure_rate: f64, seed: u64) -> ClinicResult<Self> {
        Self::with_rng(failure_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(failure_rate: f64, rng: StdRng) -> ClinicResult<Self> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(ClinicError::InvalidInput(format!(
                "failure rate must be between 0.0 and 1.0, got {}",
                failure_rate
            )));
        }
        Ok(Self { failure_rate, rng })
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl SubmissionTransport for SimulatedTransport {
    fn deliver(&mut self, _request: &ContributionRequest) -> Result<(), TransportError> {
        if self.rng.gen_bool(self.failure_rate) {
            Err(TransportError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Replays a fixed list of outcomes, then succeeds forever.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: VecDeque<Result<(), TransportError>>,
    deliveries: u32,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Result<(), TransportError>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            deliveries: 0,
        }
    }

    /// Fails the next `n` deliveries with a timeout.
    pub fn failing(n: usize) -> Self {
        Self::new(std::iter::repeat(Err(TransportError::Timeout)).take(n))
    }

    /// Number of delivery attempts seen so far.
    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }
}

impl SubmissionTransport for ScriptedTransport {
    fn deliver(&mut self, _request: &ContributionRequest) -> Result<(), TransportError> {
        self.deliveries += 1;
        self.outcomes.pop_front().unwrap_or(Ok(()))
    }
}
