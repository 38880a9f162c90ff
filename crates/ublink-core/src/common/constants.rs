//! Defaults for every tunable of a linking run.

pub const DEFAULT_Q_TOLERANCE: f64 = 0.5;
pub const DEFAULT_Q_DECREMENT: f64 = 0.95;
pub const DEFAULT_D_TOLERANCE: f64 = 0.01;
pub const DEFAULT_NUM_PEAKS: usize = 15;
pub const DEFAULT_PEAK_INCREMENT: usize = 10;
pub const DEFAULT_ITERATIONS: usize = 10;

pub const DEFAULT_CELL_LENGTH: f64 = 1.0;
pub const DEFAULT_CELL_ANGLE: f64 = 90.0;

pub const DEFAULT_MIN_WAVELENGTH: f64 = 0.8;
pub const DEFAULT_MAX_WAVELENGTH: f64 = 9.3;
pub const DEFAULT_MIN_D_SPACING: f64 = 0.6;
pub const DEFAULT_MAX_D_SPACING: f64 = 20.0;

pub const DEFAULT_BEAM_DIRECTION: [f64; 3] = [0.0, 0.0, 1.0];
