use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No pivot at or above `AbsTol` remained in the submatrix; `row` is the
    /// offending row when it could be identified cheaply.
    #[error("singular matrix at row {row:?}")]
    SingularMatrix { row: Option<usize> },

    /// The sparse pattern could not be built from the accumulated triplets.
    #[error("failed to assemble the sparse matrix: {0}")]
    MatrixBuild(String),

    /// `faer`'s LU factorization itself failed.
    #[error("LU decomposition failed: {0}")]
    Decomposition(String),
}
