use faer::Mat;
use std::fmt::{Debug, Formatter};

pub type Vec3 = [f64; 3];

const SINGULAR_DETERMINANT_EPSILON: f64 = 1.0e-14;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Mat3Error {
    #[error("3x3 matrix is singular (determinant {determinant:e})")]
    Singular { determinant: f64 },
    #[error("3x3 matrix contains a non-finite element at ({row}, {col})")]
    NonFinite { row: usize, col: usize },
}

/// Dense real 3x3 matrix backed by a `faer::Mat<f64>`.
#[derive(Clone)]
pub struct Mat3 {
    inner: Mat<f64>,
}

impl Mat3 {
    pub fn identity() -> Self {
        Self::from_fn(|row, col| if row == col { 1.0 } else { 0.0 })
    }

    pub fn from_fn(mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut inner = Mat::zeros(3, 3);
        for row in 0..3 {
            for col in 0..3 {
                inner[(row, col)] = f(row, col);
            }
        }
        Self { inner }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::from_fn(|row, col| rows[row][col])
    }

    /// Right-handed rotation by `angle` radians about `axis` (Rodrigues).
    /// A zero axis yields the identity.
    pub fn rotation(axis: Vec3, angle: f64) -> Self {
        let length = norm(axis);
        if length == 0.0 {
            return Self::identity();
        }
        let k = scale(axis, 1.0 / length);
        let (sin, cos) = angle.sin_cos();
        let skew = [[0.0, -k[2], k[1]], [k[2], 0.0, -k[0]], [-k[1], k[0], 0.0]];
        Self::from_fn(|row, col| {
            let identity = if row == col { 1.0 } else { 0.0 };
            identity * cos + sin * skew[row][col] + (1.0 - cos) * k[row] * k[col]
        })
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let mut rows = [[0.0; 3]; 3];
        for (row, values) in rows.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = self.inner[(row, col)];
            }
        }
        rows
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner[(row, col)]
    }

    pub fn row(&self, row: usize) -> Vec3 {
        [
            self.inner[(row, 0)],
            self.inner[(row, 1)],
            self.inner[(row, 2)],
        ]
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(|row, col| self.inner[(col, row)])
    }

    pub fn matmul(&self, rhs: &Mat3) -> Self {
        Self::from_fn(|row, col| {
            (0..3)
                .map(|k| self.inner[(row, k)] * rhs.inner[(k, col)])
                .sum()
        })
    }

    pub fn apply(&self, vector: Vec3) -> Vec3 {
        let mut result = [0.0; 3];
        for (row, value) in result.iter_mut().enumerate() {
            *value = (0..3).map(|col| self.inner[(row, col)] * vector[col]).sum();
        }
        result
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_fn(|row, col| self.inner[(row, col)] * factor)
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.inner;
        m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
    }

    pub fn validate_finite(&self) -> Result<(), Mat3Error> {
        for row in 0..3 {
            for col in 0..3 {
                if !self.inner[(row, col)].is_finite() {
                    return Err(Mat3Error::NonFinite { row, col });
                }
            }
        }
        Ok(())
    }

    /// Inverse via the adjugate; rejects matrices whose determinant is
    /// negligible relative to the cube of the largest element.
    pub fn inverse(&self) -> Result<Self, Mat3Error> {
        self.validate_finite()?;
        let determinant = self.determinant();
        let scale = self.max_abs_element().max(f64::MIN_POSITIVE);
        if determinant.abs() <= SINGULAR_DETERMINANT_EPSILON * scale.powi(3) {
            return Err(Mat3Error::Singular { determinant });
        }

        let m = &self.inner;
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[(r0, c0)] * m[(r1, c1)] - m[(r0, c1)] * m[(r1, c0)]
        };
        let adjugate = Self::from_rows([
            [cofactor(1, 2, 1, 2), -cofactor(0, 2, 1, 2), cofactor(0, 1, 1, 2)],
            [-cofactor(1, 2, 0, 2), cofactor(0, 2, 0, 2), -cofactor(0, 1, 0, 2)],
            [cofactor(1, 2, 0, 1), -cofactor(0, 2, 0, 1), cofactor(0, 1, 0, 1)],
        ]);
        Ok(adjugate.scaled(1.0 / determinant))
    }

    pub fn max_abs_element(&self) -> f64 {
        let mut max = 0.0_f64;
        for row in 0..3 {
            for col in 0..3 {
                max = max.max(self.inner[(row, col)].abs());
            }
        }
        max
    }
}

impl PartialEq for Mat3 {
    fn eq(&self, other: &Self) -> bool {
        self.to_rows() == other.to_rows()
    }
}

impl Debug for Mat3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Mat3").field(&self.to_rows()).finish()
    }
}

pub fn dot(lhs: Vec3, rhs: Vec3) -> f64 {
    lhs[0] * rhs[0] + lhs[1] * rhs[1] + lhs[2] * rhs[2]
}

pub fn cross(lhs: Vec3, rhs: Vec3) -> Vec3 {
    [
        lhs[1] * rhs[2] - lhs[2] * rhs[1],
        lhs[2] * rhs[0] - lhs[0] * rhs[2],
        lhs[0] * rhs[1] - lhs[1] * rhs[0],
    ]
}

pub fn norm(vector: Vec3) -> f64 {
    dot(vector, vector).sqrt()
}

pub fn scale(vector: Vec3, factor: f64) -> Vec3 {
    [vector[0] * factor, vector[1] * factor, vector[2] * factor]
}
