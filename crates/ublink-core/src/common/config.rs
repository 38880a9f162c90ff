//! Run configuration for reference-UB linking.
//!
//! Keys follow the parameter names used by the surrounding reduction workflow
//! (`QTolerance` becomes `qTolerance`, `MinDSpacing` becomes `minDSpacing`, ...).
//! Every field is optional in JSON and falls back to its documented default.

use super::constants::{
    DEFAULT_CELL_ANGLE, DEFAULT_CELL_LENGTH, DEFAULT_D_TOLERANCE, DEFAULT_ITERATIONS,
    DEFAULT_MAX_D_SPACING, DEFAULT_MAX_WAVELENGTH, DEFAULT_MIN_D_SPACING, DEFAULT_MIN_WAVELENGTH,
    DEFAULT_NUM_PEAKS, DEFAULT_PEAK_INCREMENT, DEFAULT_Q_DECREMENT, DEFAULT_Q_TOLERANCE,
};
use crate::domain::{
    LatticeConstants, LinkError, LinkResult, ReflectionCondition, ToleranceEnvelope,
};
use crate::modules::lattice::b_matrix;
use crate::modules::predictor::{BeamGeometry, PredictionRequest, index_bounds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkConfig {
    pub q_tolerance: f64,
    pub q_decrement: f64,
    pub d_tolerance: f64,
    pub num_peaks: usize,
    pub peak_increment: usize,
    pub iterations: usize,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub min_wavelength: f64,
    pub max_wavelength: f64,
    pub min_d_spacing: f64,
    pub max_d_spacing: f64,
    pub reflection_condition: ReflectionCondition,
    pub delete_workspace: bool,
    /// Ends the loop early once two consecutive iterations link the same
    /// peaks to the same indices. Off by default: exactly `iterations` run.
    pub stop_when_converged: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            q_tolerance: DEFAULT_Q_TOLERANCE,
            q_decrement: DEFAULT_Q_DECREMENT,
            d_tolerance: DEFAULT_D_TOLERANCE,
            num_peaks: DEFAULT_NUM_PEAKS,
            peak_increment: DEFAULT_PEAK_INCREMENT,
            iterations: DEFAULT_ITERATIONS,
            a: DEFAULT_CELL_LENGTH,
            b: DEFAULT_CELL_LENGTH,
            c: DEFAULT_CELL_LENGTH,
            alpha: DEFAULT_CELL_ANGLE,
            beta: DEFAULT_CELL_ANGLE,
            gamma: DEFAULT_CELL_ANGLE,
            min_wavelength: DEFAULT_MIN_WAVELENGTH,
            max_wavelength: DEFAULT_MAX_WAVELENGTH,
            min_d_spacing: DEFAULT_MIN_D_SPACING,
            max_d_spacing: DEFAULT_MAX_D_SPACING,
            reflection_condition: ReflectionCondition::Primitive,
            delete_workspace: false,
            stop_when_converged: false,
        }
    }
}

impl LinkConfig {
    pub fn lattice(&self) -> LatticeConstants {
        LatticeConstants::new(self.a, self.b, self.c, self.alpha, self.beta, self.gamma)
    }

    pub fn tolerance_envelope(&self) -> ToleranceEnvelope {
        ToleranceEnvelope {
            qtol: self.q_tolerance,
            dtol: self.d_tolerance,
            qdecrement: self.q_decrement,
        }
    }

    pub fn with_lattice(mut self, lattice: LatticeConstants) -> Self {
        self.a = lattice.a;
        self.b = lattice.b;
        self.c = lattice.c;
        self.alpha = lattice.alpha;
        self.beta = lattice.beta;
        self.gamma = lattice.gamma;
        self
    }

    /// Checks every numeric setting before any iteration runs.
    pub fn validate(&self) -> LinkResult<()> {
        require_non_negative("INPUT.QTOLERANCE", "QTolerance", self.q_tolerance)?;
        require_finite("INPUT.QDECREMENT", "QDecrement", self.q_decrement)?;
        if !(0.0..=1.0).contains(&self.q_decrement) {
            return Err(LinkError::configuration(
                "INPUT.QDECREMENT",
                format!("QDecrement must lie in [0, 1], got {}", self.q_decrement),
            ));
        }
        require_non_negative("INPUT.DTOLERANCE", "DTolerance", self.d_tolerance)?;
        if self.iterations == 0 {
            return Err(LinkError::configuration(
                "INPUT.ITERATIONS",
                "Iterations must be at least 1, got 0",
            ));
        }

        require_positive("INPUT.LATTICE_A", "a", self.a)?;
        require_positive("INPUT.LATTICE_B", "b", self.b)?;
        require_positive("INPUT.LATTICE_C", "c", self.c)?;
        require_non_negative("INPUT.LATTICE_ALPHA", "alpha", self.alpha)?;
        require_non_negative("INPUT.LATTICE_BETA", "beta", self.beta)?;
        require_non_negative("INPUT.LATTICE_GAMMA", "gamma", self.gamma)?;

        require_non_negative("INPUT.MIN_WAVELENGTH", "MinWavelength", self.min_wavelength)?;
        require_non_negative("INPUT.MAX_WAVELENGTH", "MaxWavelength", self.max_wavelength)?;
        if self.min_wavelength > self.max_wavelength {
            return Err(LinkError::configuration(
                "INPUT.MAX_WAVELENGTH",
                format!(
                    "MaxWavelength ({}) must not be below MinWavelength ({})",
                    self.max_wavelength, self.min_wavelength
                ),
            ));
        }

        require_non_negative("INPUT.MIN_DSPACING", "MinDSpacing", self.min_d_spacing)?;
        require_non_negative("INPUT.MAX_DSPACING", "MaxDSpacing", self.max_d_spacing)?;
        if self.min_d_spacing > self.max_d_spacing {
            return Err(LinkError::configuration(
                "INPUT.MAX_DSPACING",
                format!(
                    "MaxDSpacing ({}) must not be below MinDSpacing ({})",
                    self.max_d_spacing, self.min_d_spacing
                ),
            ));
        }
        if self.min_d_spacing <= 0.0 && self.min_wavelength <= 0.0 {
            return Err(LinkError::configuration(
                "INPUT.MIN_DSPACING",
                "MinDSpacing or MinWavelength must be positive to bound reflection enumeration",
            ));
        }

        // The cell and the enumeration bound are fixed for the whole run.
        let b = b_matrix(&self.lattice())?;
        let request = PredictionRequest::from_config(self, BeamGeometry::default());
        index_bounds(&b, request.effective_min_d_spacing())?;

        Ok(())
    }
}

pub fn parse_link_config(source: &str) -> LinkResult<LinkConfig> {
    serde_json::from_str(source).map_err(|error| {
        LinkError::configuration(
            "INPUT.CONFIG_FORMAT",
            format!("failed to parse linking configuration: {}", error),
        )
    })
}

pub fn load_link_config(path: impl AsRef<Path>) -> LinkResult<LinkConfig> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|error| {
        LinkError::io_system(
            "IO.CONFIG_READ",
            format!(
                "failed to read linking configuration '{}': {}",
                path.display(),
                error
            ),
        )
    })?;
    parse_link_config(&source).map_err(|error| {
        LinkError::configuration(
            "INPUT.CONFIG_FORMAT",
            format!("{} ({})", error.message(), path.display()),
        )
    })
}

fn require_finite(code: &'static str, field: &str, value: f64) -> LinkResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LinkError::configuration(
            code,
            format!("{} must be finite, got {}", field, value),
        ))
    }
}

fn require_non_negative(code: &'static str, field: &str, value: f64) -> LinkResult<()> {
    require_finite(code, field, value)?;
    if value < 0.0 {
        return Err(LinkError::configuration(
            code,
            format!("{} must be >= 0, got {}", field, value),
        ));
    }
    Ok(())
}

fn require_positive(code: &'static str, field: &str, value: f64) -> LinkResult<()> {
    require_finite(code, field, value)?;
    if value <= 0.0 {
        return Err(LinkError::configuration(
            code,
            format!("{} must be > 0, got {}", field, value),
        ));
    }
    Ok(())
}
