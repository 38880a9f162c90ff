use crate::common::LinkConfig;
use crate::domain::{IterationState, ToleranceEnvelope};

/// Per-iteration matching window: the Q-radius decays geometrically while
/// the number of candidate predicted peaks grows linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceSchedule {
    envelope: ToleranceEnvelope,
    num_peaks: usize,
    peak_increment: usize,
}

impl ToleranceSchedule {
    pub fn new(envelope: ToleranceEnvelope, num_peaks: usize, peak_increment: usize) -> Self {
        Self {
            envelope,
            num_peaks,
            peak_increment,
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(
            config.tolerance_envelope(),
            config.num_peaks,
            config.peak_increment,
        )
    }

    pub fn envelope(&self) -> ToleranceEnvelope {
        self.envelope
    }

    /// `qtol · qdecrement^m`. A zero decrement keeps `qtol` at `m = 0` and
    /// collapses to exact matching afterwards.
    pub fn qtol(&self, iteration: usize) -> f64 {
        let exponent = i32::try_from(iteration).unwrap_or(i32::MAX);
        self.envelope.qtol * self.envelope.qdecrement.powi(exponent)
    }

    /// `num_peaks + peak_increment · m`, saturating instead of wrapping.
    pub fn window(&self, iteration: usize) -> usize {
        self.num_peaks
            .saturating_add(self.peak_increment.saturating_mul(iteration))
    }

    pub fn state(&self, iteration: usize) -> IterationState {
        IterationState {
            index: iteration,
            qtol: self.qtol(iteration),
            dtol: self.envelope.dtol,
            window: self.window(iteration),
        }
    }

    pub fn states(&self, iterations: usize) -> impl Iterator<Item = IterationState> + '_ {
        (0..iterations).map(|iteration| self.state(iteration))
    }
}
