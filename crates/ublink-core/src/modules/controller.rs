//! The match-refine-repredict loop.
//!
//! Each iteration rebuilds the linked catalogue from scratch against the
//! observed peaks, refits the orientation against the fixed lattice and
//! replaces the predicted catalogue with a fresh prediction. Nothing carries
//! over between iterations except that prediction.

use super::filter::drop_origin_indices;
use super::matcher::match_peaks;
use super::predictor::{BeamGeometry, PredictionRequest, ReflectionPredictor};
use super::schedule::ToleranceSchedule;
use super::selector::select_predicted;
use super::solver::LatticeOrientationSolver;
use super::traits::{OrientationSolver, PeakPredictor};
use crate::common::LinkConfig;
use crate::domain::{
    LatticeConstants, LinkError, LinkResult, MillerIndex, OrientationMatrix, PeakCatalogue,
};
use crate::numerics::Vec3;
use tracing::{debug, info, warn};

/// Built-in fixed-cell solver and reflection enumerator, as one backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatticeBackend {
    solver: LatticeOrientationSolver,
    predictor: ReflectionPredictor,
}

impl OrientationSolver for LatticeBackend {
    fn solve_orientation(
        &self,
        peaks: &PeakCatalogue,
        lattice: &LatticeConstants,
    ) -> LinkResult<OrientationMatrix> {
        self.solver.solve_orientation(peaks, lattice)
    }
}

impl PeakPredictor for LatticeBackend {
    fn predict(
        &self,
        orientation: &OrientationMatrix,
        request: &PredictionRequest,
    ) -> LinkResult<PeakCatalogue> {
        self.predictor.predict(orientation, request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub index: usize,
    pub qtol: f64,
    pub window: usize,
    pub selected: usize,
    pub matched: usize,
    pub dropped_zero: usize,
    pub ambiguous: usize,
    pub predicted: usize,
}

impl IterationReport {
    pub fn linked(&self) -> usize {
        self.matched - self.dropped_zero
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    pub linked: PeakCatalogue,
    pub predicted: PeakCatalogue,
    pub orientation: OrientationMatrix,
    pub iterations: Vec<IterationReport>,
}

impl LinkOutcome {
    /// True when the loop stopped before the configured iteration count.
    pub fn stopped_early(&self, configured: usize) -> bool {
        self.iterations.len() < configured
    }
}

pub struct IterationController<S, P> {
    config: LinkConfig,
    request: PredictionRequest,
    solver: S,
    predictor: P,
}

impl IterationController<LatticeBackend, LatticeBackend> {
    pub fn with_lattice_backend(config: LinkConfig, geometry: BeamGeometry) -> LinkResult<Self> {
        let backend = LatticeBackend::default();
        Self::new(config, geometry, backend, backend)
    }
}

impl<S: OrientationSolver, P: PeakPredictor> IterationController<S, P> {
    /// Rejects invalid settings here, before any iteration can run.
    pub fn new(
        config: LinkConfig,
        geometry: BeamGeometry,
        solver: S,
        predictor: P,
    ) -> LinkResult<Self> {
        config.validate()?;
        geometry.unit_beam()?;
        let request = PredictionRequest::from_config(&config, geometry);
        Ok(Self {
            config,
            request,
            solver,
            predictor,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn prediction_request(&self) -> &PredictionRequest {
        &self.request
    }

    pub fn schedule(&self) -> ToleranceSchedule {
        ToleranceSchedule::from_config(&self.config)
    }

    /// Seed catalogue predicted from a reference orientation.
    pub fn seed_from_reference(&self, reference: &OrientationMatrix) -> LinkResult<PeakCatalogue> {
        let seed = self.predictor.predict(reference, &self.request)?;
        if seed.is_empty() {
            warn!("reference orientation predicts no reflections inside the configured bands");
        }
        Ok(seed)
    }

    /// Runs the configured number of iterations. A failed orientation fit
    /// aborts the run; nothing from earlier iterations is returned.
    pub fn run(&self, observed: &PeakCatalogue, seed: PeakCatalogue) -> LinkResult<LinkOutcome> {
        let schedule = self.schedule();
        let lattice = self.config.lattice();
        info!(
            observed = observed.len(),
            seed = seed.len(),
            iterations = self.config.iterations,
            "linking observed peaks to reference orientation"
        );

        let mut predicted = seed;
        let mut last: Option<(PeakCatalogue, OrientationMatrix)> = None;
        let mut previous_links: Option<Vec<(Vec3, Option<MillerIndex>)>> = None;
        let mut reports = Vec::with_capacity(self.config.iterations);

        for state in schedule.states(self.config.iterations) {
            let selected = select_predicted(&predicted, state.window);
            let outcome = match_peaks(observed, &selected, state.qtol, state.dtol);
            let linked = drop_origin_indices(&outcome.linked);

            let orientation = self.solver.solve_orientation(&linked, &lattice)?;
            let regenerated = self.predictor.predict(&orientation, &self.request)?;
            if regenerated.is_empty() {
                warn!(
                    iteration = state.index,
                    "refined orientation predicts no reflections inside the configured bands"
                );
            }

            let report = IterationReport {
                index: state.index,
                qtol: state.qtol,
                window: state.window,
                selected: selected.len(),
                matched: outcome.linked.len(),
                dropped_zero: outcome.linked.len() - linked.len(),
                ambiguous: outcome.ambiguous,
                predicted: regenerated.len(),
            };
            debug!(
                iteration = report.index,
                qtol = report.qtol,
                window = report.window,
                selected = report.selected,
                matched = report.matched,
                dropped_zero = report.dropped_zero,
                ambiguous = report.ambiguous,
                predicted = report.predicted,
                "iteration complete"
            );
            reports.push(report);

            let links = link_signature(&linked);
            let converged = previous_links.as_ref() == Some(&links);
            previous_links = Some(links);
            predicted = regenerated;
            last = Some((linked, orientation));

            if converged && self.config.stop_when_converged {
                info!(iteration = state.index, "linked peaks unchanged; stopping early");
                break;
            }
        }

        let Some((linked, orientation)) = last else {
            return Err(LinkError::internal(
                "RUN.NO_ITERATIONS",
                "linking finished without running an iteration",
            ));
        };
        info!(
            linked = linked.len(),
            predicted = predicted.len(),
            iterations = reports.len(),
            "linking finished"
        );

        Ok(LinkOutcome {
            linked: linked.with_orientation(orientation.clone()),
            predicted,
            orientation,
            iterations: reports,
        })
    }
}

/// Linked positions are copied from observed peaks, so a position identifies
/// the observed peak it came from.
fn link_signature(linked: &PeakCatalogue) -> Vec<(Vec3, Option<MillerIndex>)> {
    linked.iter().map(|peak| (peak.q_lab, peak.hkl)).collect()
}
