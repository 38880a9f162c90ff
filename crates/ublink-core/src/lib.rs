//! Links the indexing of a diffraction measurement to a reference
//! orientation matrix.
//!
//! Observed peaks are matched against predicted reflections inside a
//! shrinking box tolerance while the candidate window grows; every iteration
//! refits the orientation against the fixed unit cell and re-predicts the
//! reflections from it. See [`modules::IterationController`].

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;

pub use common::{LinkConfig, load_link_config, parse_link_config};
pub use domain::{
    LatticeConstants, LinkError, LinkErrorCategory, LinkResult, MillerIndex, OrientationMatrix,
    Peak, PeakCatalogue, ReflectionCondition,
};
