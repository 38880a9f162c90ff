//! Fixed-cell orientation fit.
//!
//! Only the rotation `U` is refined: with `B` built from the run's lattice
//! constants, `U` minimises `Σ |U·B·h − Q/2π|²` over the indexed peaks
//! (Horn's closed-form quaternion solution). The cell therefore cannot drift
//! from one iteration to the next.

use super::lattice::b_matrix;
use super::traits::OrientationSolver;
use crate::domain::{LatticeConstants, LinkError, LinkResult, OrientationMatrix, PeakCatalogue};
use crate::numerics::{EigenError, Mat3, Vec3, cross, norm, scale, symmetric_eigen};
use faer::Mat;
use std::f64::consts::TAU;
use tracing::trace;

pub const MIN_INDEXED_PEAKS: usize = 2;

const COLLINEAR_SINE_EPSILON: f64 = 1.0e-6;
const EIGEN_GAP_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrientationFitError {
    #[error("orientation fit needs at least {required} indexed peaks, got {found}")]
    TooFewPeaks { required: usize, found: usize },
    #[error("indexed reflections are collinear; rotation about their common axis is undetermined")]
    CollinearReflections,
    #[error("rotation is ill-determined (leading eigenvalues {leading:e} and {second:e} coincide)")]
    AmbiguousRotation { leading: f64, second: f64 },
    #[error("reference and observed vector counts differ ({reference} vs {observed})")]
    LengthMismatch { reference: usize, observed: usize },
    #[error(transparent)]
    Eigen(#[from] EigenError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LatticeOrientationSolver;

impl LatticeOrientationSolver {
    /// Proper rotation `R` maximising `Σ observed_i · (R · reference_i)`.
    pub fn fit_rotation(
        reference: &[Vec3],
        observed: &[Vec3],
    ) -> Result<Mat3, OrientationFitError> {
        if reference.len() != observed.len() {
            return Err(OrientationFitError::LengthMismatch {
                reference: reference.len(),
                observed: observed.len(),
            });
        }
        if reference.len() < MIN_INDEXED_PEAKS {
            return Err(OrientationFitError::TooFewPeaks {
                required: MIN_INDEXED_PEAKS,
                found: reference.len(),
            });
        }
        if are_collinear(reference) {
            return Err(OrientationFitError::CollinearReflections);
        }

        let mut s = [[0.0_f64; 3]; 3];
        for (x, y) in reference.iter().zip(observed) {
            for row in 0..3 {
                for col in 0..3 {
                    s[row][col] += x[row] * y[col];
                }
            }
        }

        let [[sxx, sxy, sxz], [syx, syy, syz], [szx, szy, szz]] = s;
        let n = [
            [sxx + syy + szz, syz - szy, szx - sxz, sxy - syx],
            [syz - szy, sxx - syy - szz, sxy + syx, szx + sxz],
            [szx - sxz, sxy + syx, -sxx + syy - szz, syz + szy],
            [sxy - syx, szx + sxz, syz + szy, -sxx - syy + szz],
        ];
        let mut n_matrix = Mat::<f64>::zeros(4, 4);
        for (row, values) in n.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                n_matrix[(row, col)] = *value;
            }
        }

        let eigen = symmetric_eigen(&n_matrix)?;
        let leading = eigen.eigenvalues[0];
        let second = eigen.eigenvalues[1];
        if leading - second <= EIGEN_GAP_EPSILON * leading.abs().max(1.0) {
            return Err(OrientationFitError::AmbiguousRotation { leading, second });
        }

        let q = eigen.eigenvector(0);
        let length = q.iter().map(|component| component * component).sum::<f64>().sqrt();
        let [q0, q1, q2, q3] = [q[0] / length, q[1] / length, q[2] / length, q[3] / length];

        Ok(Mat3::from_rows([
            [
                q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3,
                2.0 * (q1 * q2 - q0 * q3),
                2.0 * (q1 * q3 + q0 * q2),
            ],
            [
                2.0 * (q1 * q2 + q0 * q3),
                q0 * q0 - q1 * q1 + q2 * q2 - q3 * q3,
                2.0 * (q2 * q3 - q0 * q1),
            ],
            [
                2.0 * (q1 * q3 - q0 * q2),
                2.0 * (q2 * q3 + q0 * q1),
                q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3,
            ],
        ]))
    }
}

impl OrientationSolver for LatticeOrientationSolver {
    fn solve_orientation(
        &self,
        peaks: &PeakCatalogue,
        lattice: &LatticeConstants,
    ) -> LinkResult<OrientationMatrix> {
        let b = b_matrix(lattice)?;

        let (reference, observed): (Vec<Vec3>, Vec<Vec3>) = peaks
            .iter()
            .filter(|peak| peak.is_indexed())
            .filter_map(|peak| {
                let hkl = peak.hkl?;
                Some((b.apply(hkl.as_vector()), scale(peak.q_lab, 1.0 / TAU)))
            })
            .unzip();

        let rotation = Self::fit_rotation(&reference, &observed).map_err(|error| {
            LinkError::degenerate_fit(
                "RUN.DEGENERATE_FIT",
                format!(
                    "cannot fit an orientation to {} indexed peaks: {}",
                    reference.len(),
                    error
                ),
            )
        })?;
        trace!(peaks = reference.len(), "fitted fixed-cell orientation");

        Ok(OrientationMatrix::new(rotation.matmul(&b)))
    }
}

fn are_collinear(vectors: &[Vec3]) -> bool {
    let Some(axis) = vectors
        .iter()
        .copied()
        .max_by(|lhs, rhs| norm(*lhs).total_cmp(&norm(*rhs)))
    else {
        return true;
    };
    let axis_length = norm(axis);
    if axis_length == 0.0 {
        return true;
    }

    !vectors.iter().any(|vector| {
        let length = norm(*vector);
        length > 0.0 && norm(cross(axis, *vector)) / (axis_length * length) > COLLINEAR_SINE_EPSILON
    })
}
