use super::predictor::PredictionRequest;
use crate::domain::{LatticeConstants, LinkResult, OrientationMatrix, PeakCatalogue};

/// Fits an orientation matrix to an indexed catalogue with the unit cell held
/// fixed. Must be deterministic for a fixed input.
pub trait OrientationSolver {
    fn solve_orientation(
        &self,
        peaks: &PeakCatalogue,
        lattice: &LatticeConstants,
    ) -> LinkResult<OrientationMatrix>;
}

/// Enumerates the reflections reachable for an orientation. An empty
/// catalogue is a valid answer.
pub trait PeakPredictor {
    fn predict(
        &self,
        orientation: &OrientationMatrix,
        request: &PredictionRequest,
    ) -> LinkResult<PeakCatalogue>;
}

impl<T> OrientationSolver for &T
where
    T: OrientationSolver + ?Sized,
{
    fn solve_orientation(
        &self,
        peaks: &PeakCatalogue,
        lattice: &LatticeConstants,
    ) -> LinkResult<OrientationMatrix> {
        (**self).solve_orientation(peaks, lattice)
    }
}

impl<T> PeakPredictor for &T
where
    T: PeakPredictor + ?Sized,
{
    fn predict(
        &self,
        orientation: &OrientationMatrix,
        request: &PredictionRequest,
    ) -> LinkResult<PeakCatalogue> {
        (**self).predict(orientation, request)
    }
}

#[cfg(test)]
mod tests {
    use super::{OrientationSolver, PeakPredictor};
    use crate::domain::{
        LatticeConstants, LinkError, LinkErrorCategory, LinkResult, OrientationMatrix,
        PeakCatalogue,
    };
    use crate::modules::predictor::PredictionRequest;

    struct FailingSolver;

    impl OrientationSolver for FailingSolver {
        fn solve_orientation(
            &self,
            _peaks: &PeakCatalogue,
            _lattice: &LatticeConstants,
        ) -> LinkResult<OrientationMatrix> {
            Err(LinkError::degenerate_fit(
                "RUN.DEGENERATE_FIT",
                "orientation fit failed",
            ))
        }
    }

    struct EmptyPredictor;

    impl PeakPredictor for EmptyPredictor {
        fn predict(
            &self,
            _orientation: &OrientationMatrix,
            _request: &PredictionRequest,
        ) -> LinkResult<PeakCatalogue> {
            Ok(PeakCatalogue::default())
        }
    }

    fn solve_through_reference(solver: impl OrientationSolver) -> LinkResult<OrientationMatrix> {
        solver.solve_orientation(&PeakCatalogue::default(), &LatticeConstants::default())
    }

    #[test]
    fn borrowed_solver_preserves_errors() {
        let error = solve_through_reference(&FailingSolver).expect_err("solver should fail");
        assert_eq!(error.category(), LinkErrorCategory::DegenerateFitError);
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn borrowed_predictor_forwards_results() {
        let predictor = EmptyPredictor;
        let borrowed = &predictor;
        let catalogue = borrowed
            .predict(
                &OrientationMatrix::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
                &PredictionRequest::default(),
            )
            .expect("prediction should succeed");
        assert!(catalogue.is_empty());
    }
}
