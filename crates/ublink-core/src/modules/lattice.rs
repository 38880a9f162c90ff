//! Reciprocal-lattice (B) matrix from fixed unit-cell constants, in the
//! Busing & Levy convention without the 2π factor.

use crate::domain::{LatticeConstants, LinkError, LinkResult};
use crate::numerics::Mat3;

/// Upper-triangular B matrix of a cell, with `|B·h| = 1/d(hkl)`.
pub fn b_matrix(lattice: &LatticeConstants) -> LinkResult<Mat3> {
    let LatticeConstants {
        a,
        b,
        c,
        alpha,
        beta,
        gamma,
    } = *lattice;

    let (cos_alpha, sin_alpha) = cos_sin_degrees(alpha);
    let (cos_beta, sin_beta) = cos_sin_degrees(beta);
    let (cos_gamma, sin_gamma) = cos_sin_degrees(gamma);

    let volume_factor = 1.0 - cos_alpha * cos_alpha - cos_beta * cos_beta - cos_gamma * cos_gamma
        + 2.0 * cos_alpha * cos_beta * cos_gamma;
    if !(volume_factor > 0.0) || sin_alpha <= 0.0 || sin_beta <= 0.0 || sin_gamma <= 0.0 {
        return Err(LinkError::configuration(
            "INPUT.LATTICE_ANGLES",
            format!(
                "cell angles alpha={}, beta={}, gamma={} do not describe a valid unit cell",
                alpha, beta, gamma
            ),
        ));
    }
    let volume = a * b * c * volume_factor.sqrt();

    let a_star = b * c * sin_alpha / volume;
    let b_star = a * c * sin_beta / volume;
    let c_star = a * b * sin_gamma / volume;
    let cos_beta_star = (cos_alpha * cos_gamma - cos_beta) / (sin_alpha * sin_gamma);
    let cos_gamma_star = (cos_alpha * cos_beta - cos_gamma) / (sin_alpha * sin_beta);
    let sin_beta_star = (1.0 - cos_beta_star * cos_beta_star).max(0.0).sqrt();
    let sin_gamma_star = (1.0 - cos_gamma_star * cos_gamma_star).max(0.0).sqrt();

    let matrix = Mat3::from_rows([
        [a_star, b_star * cos_gamma_star, c_star * cos_beta_star],
        [0.0, b_star * sin_gamma_star, -c_star * sin_beta_star * cos_alpha],
        [0.0, 0.0, 1.0 / c],
    ]);
    matrix.validate_finite().map_err(|error| {
        LinkError::configuration("INPUT.LATTICE", format!("invalid B matrix: {}", error))
    })?;
    Ok(matrix)
}

fn cos_sin_degrees(angle: f64) -> (f64, f64) {
    let radians = angle.to_radians();
    (radians.cos(), radians.sin())
}
