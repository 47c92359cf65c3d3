use thiserror::Error;

/// Errors raised while binding a circuit or driving an analysis.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] volt_core::Error),

    #[error(transparent)]
    Matrix(#[from] volt_matrix::Error),

    #[error(transparent)]
    Device(#[from] volt_devices::Error),

    /// Newton or transient step-down exhausted every recovery strategy.
    #[error("no convergence: residual={residual:e}, step_size={step_size:e}")]
    NoConvergence { residual: f64, step_size: f64 },

    /// The sweep element named in a DC analysis is not a voltage or current source.
    #[error("element '{0}' is not a sweepable source")]
    NotSweepable(String),

    /// The caller's cancellation token fired.
    #[error("simulation cancelled")]
    Cancelled,
}
