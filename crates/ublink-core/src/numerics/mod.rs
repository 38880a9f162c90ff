//! Small dense linear-algebra kernels used by the orientation fit and the
//! reflection predictor. Storage is `faer::Mat<f64>`; the kernels themselves
//! are tuned for the 3x3 and 4x4 sizes this crate works with.

pub mod eigen;
pub mod mat3;

pub use eigen::{EigenError, SymmetricEigen, symmetric_eigen};
pub use mat3::{Mat3, Mat3Error, Vec3, cross, dot, norm, scale};
