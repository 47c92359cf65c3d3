pub use crate::error::Error;
pub type Result<T> = core::result::Result<T, Error>;

pub use crate::config::SolverConfig;
pub use crate::newton::convergence_check;
pub use crate::cancel::CancellationToken;
pub use crate::export::{ExportPoint, ExportSink, PhasorExportPoint, PhasorExportSink};
pub use crate::simulation::Simulation;
