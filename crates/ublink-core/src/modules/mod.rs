pub mod controller;
pub mod filter;
pub mod lattice;
pub mod matcher;
pub mod predictor;
pub mod schedule;
pub mod selector;
pub mod serialization;
pub mod solver;

mod traits;

pub use controller::{IterationController, IterationReport, LatticeBackend, LinkOutcome};
pub use filter::drop_origin_indices;
pub use lattice::b_matrix;
pub use matcher::{MatchOutcome, candidate_precedence, match_peaks, within_box};
pub use predictor::{
    Band, BeamGeometry, PredictionRequest, ReflectionPredictor, index_bounds, load_beam_geometry,
};
pub use schedule::ToleranceSchedule;
pub use selector::{descending_d_spacing, select_predicted};
pub use serialization::{
    PeakRow, PeakTable, TableKind, parse_peak_table, read_orientation, read_peak_table,
    render_linked_summary, write_orientation, write_peak_table, write_text_artifact,
};
pub use solver::{LatticeOrientationSolver, OrientationFitError};
pub use traits::{OrientationSolver, PeakPredictor};
