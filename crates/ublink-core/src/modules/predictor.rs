//! Reflection enumeration for a given orientation.
//!
//! Convention: `Q = k_i − k_f` with the incident beam along `beam_direction`,
//! so an elastic reflection is reachable only when `Q·b̂ > 0`, at wavelength
//! `λ = 4π (Q·b̂) / |Q|²`.

use super::traits::PeakPredictor;
use crate::common::LinkConfig;
use crate::common::constants::DEFAULT_BEAM_DIRECTION;
use crate::domain::{
    LinkError, LinkResult, MillerIndex, OrientationMatrix, Peak, PeakCatalogue,
    ReflectionCondition,
};
use crate::numerics::{Mat3, Vec3, dot, norm, scale};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fs;
use std::path::Path;

/// Largest index magnitude the enumerator will visit along any axis.
pub const MAX_INDEX_BOUND: i32 = 512;

/// The slice of instrument geometry reflection prediction depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BeamGeometry {
    pub beam_direction: Vec3,
    /// Detector coverage in scattering angle 2θ, degrees, inclusive.
    pub two_theta_range: Option<[f64; 2]>,
}

impl Default for BeamGeometry {
    fn default() -> Self {
        Self {
            beam_direction: DEFAULT_BEAM_DIRECTION,
            two_theta_range: None,
        }
    }
}

impl BeamGeometry {
    pub fn unit_beam(&self) -> LinkResult<Vec3> {
        let length = norm(self.beam_direction);
        if !length.is_finite() || length == 0.0 {
            return Err(LinkError::configuration(
                "INPUT.BEAM_DIRECTION",
                format!(
                    "beam direction {:?} must be a finite non-zero vector",
                    self.beam_direction
                ),
            ));
        }
        Ok(scale(self.beam_direction, 1.0 / length))
    }
}

pub fn load_beam_geometry(path: impl AsRef<Path>) -> LinkResult<BeamGeometry> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|error| {
        LinkError::io_system(
            "IO.WORKSPACE_READ",
            format!("failed to read workspace geometry '{}': {}", path.display(), error),
        )
    })?;
    serde_json::from_str(&source).map_err(|error| {
        LinkError::configuration(
            "INPUT.WORKSPACE_FORMAT",
            format!(
                "failed to parse workspace geometry '{}': {}",
                path.display(),
                error
            ),
        )
    })
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub geometry: BeamGeometry,
    pub wavelength: Band,
    pub d_spacing: Band,
    pub reflection_condition: ReflectionCondition,
}

impl PredictionRequest {
    pub fn from_config(config: &LinkConfig, geometry: BeamGeometry) -> Self {
        Self {
            geometry,
            wavelength: Band::new(config.min_wavelength, config.max_wavelength),
            d_spacing: Band::new(config.min_d_spacing, config.max_d_spacing),
            reflection_condition: config.reflection_condition,
        }
    }

    /// Smallest reachable d-spacing: the configured floor, or the
    /// backscattering limit `λ_min / 2` when that is larger.
    pub fn effective_min_d_spacing(&self) -> f64 {
        self.d_spacing.min.max(self.wavelength.min / 2.0)
    }
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self::from_config(&LinkConfig::default(), BeamGeometry::default())
    }
}

/// Per-axis enumeration bound `ceil(|row_i(UB⁻¹)| / d_min)`. Rows of `UB⁻¹`
/// and `B⁻¹` have equal norms, so the bound depends only on the cell.
pub fn index_bounds(ub: &Mat3, min_d_spacing: f64) -> LinkResult<[i32; 3]> {
    if !(min_d_spacing > 0.0) {
        return Err(LinkError::configuration(
            "INPUT.MIN_DSPACING",
            "MinDSpacing or MinWavelength must be positive to bound reflection enumeration",
        ));
    }
    let inverse = ub.inverse().map_err(|error| {
        LinkError::degenerate_fit(
            "RUN.SINGULAR_ORIENTATION",
            format!("orientation matrix cannot be inverted: {}", error),
        )
    })?;

    let mut bounds = [0; 3];
    for (axis, bound) in bounds.iter_mut().enumerate() {
        let extent = (norm(inverse.row(axis)) / min_d_spacing).ceil();
        if !(extent <= f64::from(MAX_INDEX_BOUND)) {
            return Err(LinkError::configuration(
                "INPUT.MIN_DSPACING",
                format!(
                    "MinDSpacing {} requires indices up to {} along axis {}, above the limit of {}",
                    min_d_spacing, extent, axis, MAX_INDEX_BOUND
                ),
            ));
        }
        *bound = extent as i32;
    }
    Ok(bounds)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionPredictor;

impl ReflectionPredictor {
    fn reachable(&self, q_lab: Vec3, beam: Vec3, request: &PredictionRequest) -> bool {
        let q_beam = dot(q_lab, beam);
        if q_beam <= 0.0 {
            return false;
        }
        let q_squared = dot(q_lab, q_lab);
        let wavelength = 2.0 * TAU * q_beam / q_squared;
        if !request.wavelength.contains(wavelength) {
            return false;
        }

        match request.geometry.two_theta_range {
            Some([min, max]) => {
                let sin_theta = (wavelength * q_squared.sqrt() / (4.0 * PI)).min(1.0);
                let two_theta = 2.0 * sin_theta.asin().to_degrees();
                two_theta >= min && two_theta <= max
            }
            None => true,
        }
    }
}

impl PeakPredictor for ReflectionPredictor {
    fn predict(
        &self,
        orientation: &OrientationMatrix,
        request: &PredictionRequest,
    ) -> LinkResult<PeakCatalogue> {
        let beam = request.geometry.unit_beam()?;
        let [h_max, k_max, l_max] =
            index_bounds(orientation.matrix(), request.effective_min_d_spacing())?;

        let mut peaks = Vec::new();
        for h in -h_max..=h_max {
            for k in -k_max..=k_max {
                for l in -l_max..=l_max {
                    let hkl = MillerIndex::new(h, k, l);
                    if hkl.is_origin() || !request.reflection_condition.allows(hkl) {
                        continue;
                    }
                    let d_spacing = orientation.d_spacing(hkl);
                    if !request.d_spacing.contains(d_spacing) {
                        continue;
                    }
                    let q_lab = orientation.q_lab(hkl);
                    if self.reachable(q_lab, beam, request) {
                        peaks.push(Peak::indexed(q_lab, d_spacing, hkl));
                    }
                }
            }
        }

        peaks.sort_by(|lhs, rhs| {
            rhs.d_spacing
                .total_cmp(&lhs.d_spacing)
                .then_with(|| lhs.hkl.cmp(&rhs.hkl))
        });
        Ok(PeakCatalogue::new(peaks).with_orientation(orientation.clone()))
    }
}
