pub mod errors;

pub use errors::{LinkError, LinkErrorCategory, LinkResult};

use crate::numerics::{Mat3, Vec3, norm, scale};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Integer reflection indices.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl MillerIndex {
    pub const ORIGIN: Self = Self { h: 0, k: 0, l: 0 };

    pub const fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    /// Nearest integer triple to a continuous index.
    pub fn rounded(continuous: Vec3) -> Self {
        Self::new(
            continuous[0].round() as i32,
            continuous[1].round() as i32,
            continuous[2].round() as i32,
        )
    }

    pub const fn is_origin(self) -> bool {
        self.h == 0 && self.k == 0 && self.l == 0
    }

    pub fn as_vector(self) -> Vec3 {
        [f64::from(self.h), f64::from(self.k), f64::from(self.l)]
    }
}

impl From<[i32; 3]> for MillerIndex {
    fn from(value: [i32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<MillerIndex> for [i32; 3] {
    fn from(value: MillerIndex) -> Self {
        [value.h, value.k, value.l]
    }
}

impl Display for MillerIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.h, self.k, self.l)
    }
}

/// A reflection: Q-lab position (Å⁻¹), d-spacing (Å) and an optional index.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    pub q_lab: Vec3,
    pub d_spacing: f64,
    pub hkl: Option<MillerIndex>,
    pub hkl_continuous: Option<Vec3>,
}

impl Peak {
    pub fn observed(q_lab: Vec3, d_spacing: f64) -> Self {
        Self {
            q_lab,
            d_spacing,
            hkl: None,
            hkl_continuous: None,
        }
    }

    pub fn indexed(q_lab: Vec3, d_spacing: f64, hkl: MillerIndex) -> Self {
        Self {
            q_lab,
            d_spacing,
            hkl: Some(hkl),
            hkl_continuous: Some(hkl.as_vector()),
        }
    }

    /// Copy of `self` carrying the index of `source`; position and d-spacing
    /// stay those of `self`.
    pub fn with_index_from(&self, source: &Peak) -> Self {
        Self {
            q_lab: self.q_lab,
            d_spacing: self.d_spacing,
            hkl: source.hkl,
            hkl_continuous: source
                .hkl_continuous
                .or_else(|| source.hkl.map(MillerIndex::as_vector)),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.hkl.is_some_and(|hkl| !hkl.is_origin())
    }
}

/// Ordered, immutable collection of peaks with an optional orientation.
///
/// Pipeline stages never mutate a catalogue; they build a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakCatalogue {
    peaks: Vec<Peak>,
    orientation: Option<OrientationMatrix>,
}

impl PeakCatalogue {
    pub fn new(peaks: Vec<Peak>) -> Self {
        Self {
            peaks,
            orientation: None,
        }
    }

    pub fn with_orientation(mut self, orientation: OrientationMatrix) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn orientation(&self) -> Option<&OrientationMatrix> {
        self.orientation.as_ref()
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.peaks.iter()
    }

    pub fn hkls(&self) -> Vec<MillerIndex> {
        self.peaks.iter().filter_map(|peak| peak.hkl).collect()
    }
}

impl FromIterator<Peak> for PeakCatalogue {
    fn from_iter<T: IntoIterator<Item = Peak>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PeakCatalogue {
    type Item = &'a Peak;
    type IntoIter = std::slice::Iter<'a, Peak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

/// UB matrix mapping integer indices to reciprocal-lattice vectors without
/// the 2π factor: `Q_lab = 2π · UB · h`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationMatrix {
    ub: Mat3,
}

impl OrientationMatrix {
    pub fn new(ub: Mat3) -> Self {
        Self { ub }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Mat3::from_rows(rows))
    }

    pub fn matrix(&self) -> &Mat3 {
        &self.ub
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        self.ub.to_rows()
    }

    pub fn q_lab(&self, hkl: MillerIndex) -> Vec3 {
        scale(self.ub.apply(hkl.as_vector()), TAU)
    }

    pub fn d_spacing(&self, hkl: MillerIndex) -> f64 {
        1.0 / norm(self.ub.apply(hkl.as_vector()))
    }
}

/// Unit-cell lengths (Å) and angles (degrees), held fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeConstants {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl LatticeConstants {
    pub const fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    pub const fn cubic(a: f64) -> Self {
        Self::new(a, a, a, 90.0, 90.0, 90.0)
    }
}

impl Default for LatticeConstants {
    fn default() -> Self {
        Self::cubic(1.0)
    }
}

/// Lattice-centring rule restricting which indices may reflect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReflectionCondition {
    #[default]
    Primitive,
    CFaceCentred,
    AFaceCentred,
    BFaceCentred,
    BodyCentred,
    AllFaceCentred,
    RhombohedrallyObverse,
    RhombohedrallyReverse,
    HexagonallyReverse,
}

impl ReflectionCondition {
    pub const ALL: [Self; 9] = [
        Self::Primitive,
        Self::CFaceCentred,
        Self::AFaceCentred,
        Self::BFaceCentred,
        Self::BodyCentred,
        Self::AllFaceCentred,
        Self::RhombohedrallyObverse,
        Self::RhombohedrallyReverse,
        Self::HexagonallyReverse,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primitive => "Primitive",
            Self::CFaceCentred => "C-face centred",
            Self::AFaceCentred => "A-face centred",
            Self::BFaceCentred => "B-face centred",
            Self::BodyCentred => "Body centred",
            Self::AllFaceCentred => "All-face centred",
            Self::RhombohedrallyObverse => "Rhombohedrally centred, obverse",
            Self::RhombohedrallyReverse => "Rhombohedrally centred, reverse",
            Self::HexagonallyReverse => "Hexagonally centred, reverse",
        }
    }

    pub const fn short_symbol(self) -> &'static str {
        match self {
            Self::Primitive => "P",
            Self::CFaceCentred => "C",
            Self::AFaceCentred => "A",
            Self::BFaceCentred => "B",
            Self::BodyCentred => "I",
            Self::AllFaceCentred => "F",
            Self::RhombohedrallyObverse => "R_obv",
            Self::RhombohedrallyReverse => "R_rev",
            Self::HexagonallyReverse => "H",
        }
    }

    pub fn allows(self, hkl: MillerIndex) -> bool {
        let MillerIndex { h, k, l } = hkl;
        match self {
            Self::Primitive => true,
            Self::CFaceCentred => (h + k).rem_euclid(2) == 0,
            Self::AFaceCentred => (k + l).rem_euclid(2) == 0,
            Self::BFaceCentred => (h + l).rem_euclid(2) == 0,
            Self::BodyCentred => (h + k + l).rem_euclid(2) == 0,
            Self::AllFaceCentred => {
                let parity = h.rem_euclid(2);
                k.rem_euclid(2) == parity && l.rem_euclid(2) == parity
            }
            Self::RhombohedrallyObverse => (-h + k + l).rem_euclid(3) == 0,
            Self::RhombohedrallyReverse => (h - k + l).rem_euclid(3) == 0,
            Self::HexagonallyReverse => (h - k).rem_euclid(3) == 0,
        }
    }
}

impl Display for ReflectionCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReflectionCondition {
    type Err = LinkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|condition| {
                condition.as_str().eq_ignore_ascii_case(normalized)
                    || condition.short_symbol().eq_ignore_ascii_case(normalized)
            })
            .ok_or_else(|| {
                LinkError::configuration(
                    "INPUT.REFLECTION_CONDITION",
                    format!("unknown ReflectionCondition '{}'", value),
                )
            })
    }
}

impl TryFrom<String> for ReflectionCondition {
    type Error = LinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReflectionCondition> for String {
    fn from(value: ReflectionCondition) -> Self {
        value.as_str().to_string()
    }
}

/// Initial Q-radius, constant d-spacing tolerance and Q-radius decay factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceEnvelope {
    pub qtol: f64,
    pub dtol: f64,
    pub qdecrement: f64,
}

/// Matching window in force during iteration `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationState {
    pub index: usize,
    pub qtol: f64,
    pub dtol: f64,
    pub window: usize,
}

#[cfg(test)]
mod tests {
    use super::{MillerIndex, OrientationMatrix, Peak, PeakCatalogue, ReflectionCondition};

    #[test]
    fn reflection_condition_parses_names_and_symbols() {
        assert_eq!(
            "primitive".parse::<ReflectionCondition>().expect("known name"),
            ReflectionCondition::Primitive
        );
        assert_eq!(
            "Rhombohedrally centred, obverse"
                .parse::<ReflectionCondition>()
                .expect("known name"),
            ReflectionCondition::RhombohedrallyObverse
        );
        assert_eq!(
            "I".parse::<ReflectionCondition>().expect("known symbol"),
            ReflectionCondition::BodyCentred
        );

        let error = "Z-centred"
            .parse::<ReflectionCondition>()
            .expect_err("unknown name should fail");
        assert_eq!(error.code(), "INPUT.REFLECTION_CONDITION");
    }

    #[test]
    fn centring_rules_filter_expected_indices() {
        let body = ReflectionCondition::BodyCentred;
        assert!(body.allows(MillerIndex::new(1, 1, 0)));
        assert!(!body.allows(MillerIndex::new(1, 0, 0)));

        let face = ReflectionCondition::AllFaceCentred;
        assert!(face.allows(MillerIndex::new(1, 1, 1)));
        assert!(face.allows(MillerIndex::new(2, 0, 0)));
        assert!(!face.allows(MillerIndex::new(1, 1, 0)));
        assert!(face.allows(MillerIndex::new(-1, 1, -1)));

        let obverse = ReflectionCondition::RhombohedrallyObverse;
        assert!(obverse.allows(MillerIndex::new(1, 0, 1)));
        assert!(!obverse.allows(MillerIndex::new(1, 0, 0)));

        let hexagonal = ReflectionCondition::HexagonallyReverse;
        assert!(hexagonal.allows(MillerIndex::new(2, -1, 5)));
        assert!(!hexagonal.allows(MillerIndex::new(1, 0, 0)));
    }

    #[test]
    fn index_copy_keeps_observed_position() {
        let observed = Peak::observed([1.0, 2.0, 3.0], 2.5);
        let predicted = Peak::indexed([1.1, 2.1, 2.9], 2.4, MillerIndex::new(1, -1, 2));

        let linked = observed.with_index_from(&predicted);
        assert_eq!(linked.q_lab, observed.q_lab);
        assert_eq!(linked.d_spacing, observed.d_spacing);
        assert_eq!(linked.hkl, Some(MillerIndex::new(1, -1, 2)));
        assert_eq!(linked.hkl_continuous, Some([1.0, -1.0, 2.0]));
    }

    #[test]
    fn orientation_maps_indices_to_q_lab() {
        let ub = OrientationMatrix::from_rows([[0.2, 0.0, 0.0], [0.0, 0.2, 0.0], [0.0, 0.0, 0.2]]);
        let q = ub.q_lab(MillerIndex::new(1, 0, 0));
        assert!((q[0] - std::f64::consts::TAU * 0.2).abs() < 1.0e-12);
        assert!((ub.d_spacing(MillerIndex::new(1, 0, 0)) - 5.0).abs() < 1.0e-12);
    }

    #[test]
    fn catalogue_collects_from_iterator() {
        let catalogue: PeakCatalogue = (1..=3)
            .map(|index| Peak::observed([f64::from(index), 0.0, 0.0], 1.0))
            .collect();
        assert_eq!(catalogue.len(), 3);
        assert!(catalogue.orientation().is_none());
        assert!(catalogue.hkls().is_empty());
    }
}
