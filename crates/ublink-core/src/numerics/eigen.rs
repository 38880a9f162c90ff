use faer::{Mat, Side};

const SYMMETRY_EPSILON: f64 = 1.0e-10;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EigenError {
    #[error("eigen-decomposition requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("eigen-decomposition requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is not symmetric at ({row}, {col})")]
    NonSymmetricMatrix { row: usize, col: usize },
    #[error("matrix contains a non-finite element at ({row}, {col})")]
    NonFiniteElement { row: usize, col: usize },
    #[error("self-adjoint eigen-decomposition did not converge")]
    NoConvergence,
}

/// Eigenpairs of a real symmetric matrix, sorted by descending eigenvalue.
/// Column `i` of `eigenvectors` belongs to `eigenvalues[i]`.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Mat<f64>,
}

impl SymmetricEigen {
    pub fn eigenvector(&self, index: usize) -> Vec<f64> {
        (0..self.eigenvectors.nrows())
            .map(|row| self.eigenvectors[(row, index)])
            .collect()
    }
}

/// Eigen-decomposition of a real symmetric matrix.
///
/// Symmetry is checked up front since faer only reads the lower triangle.
pub fn symmetric_eigen(matrix: &Mat<f64>) -> Result<SymmetricEigen, EigenError> {
    let dimension = validate_symmetric(matrix)?;
    let decomposition = matrix
        .self_adjoint_eigen(Side::Lower)
        .map_err(|_| EigenError::NoConvergence)?;

    // faer sorts ascending.
    let ascending: Vec<f64> = decomposition.S().column_vector().iter().copied().collect();
    let vectors = decomposition.U();
    let eigenvalues = ascending.iter().rev().copied().collect();
    let eigenvectors = Mat::<f64>::from_fn(dimension, dimension, |row, col| {
        vectors[(row, dimension - 1 - col)]
    });

    Ok(SymmetricEigen {
        eigenvalues,
        eigenvectors,
    })
}

fn validate_symmetric(matrix: &Mat<f64>) -> Result<usize, EigenError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows != cols {
        return Err(EigenError::NonSquareMatrix { rows, cols });
    }
    if rows == 0 {
        return Err(EigenError::EmptyMatrix);
    }

    let scale = frobenius_norm(matrix).max(1.0);
    for row in 0..rows {
        for col in 0..cols {
            if !matrix[(row, col)].is_finite() {
                return Err(EigenError::NonFiniteElement { row, col });
            }
            if (matrix[(row, col)] - matrix[(col, row)]).abs() > SYMMETRY_EPSILON * scale {
                return Err(EigenError::NonSymmetricMatrix { row, col });
            }
        }
    }
    Ok(rows)
}

fn frobenius_norm(matrix: &Mat<f64>) -> f64 {
    let mut sum = 0.0;
    for row in 0..matrix.nrows() {
        for col in 0..matrix.ncols() {
            sum += matrix[(row, col)] * matrix[(row, col)];
        }
    }
    sum.sqrt()
}
