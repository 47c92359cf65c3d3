use thiserror::Error;

/// Errors raised while binding or loading a device behaviour.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] volt_core::Error),

    #[error(transparent)]
    Matrix(#[from] volt_matrix::Error),
}
