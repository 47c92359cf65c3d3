//! Drives a bound circuit through the four representative analysis kinds:
//! operating point, DC sweep, AC small-signal sweep, and transient. Builds
//! on `volt-core`'s entity/variable model and `volt-devices`' behaviours,
//! assembling them into `volt-matrix` sparse systems and iterating them to
//! convergence via Newton's method.

pub mod ac;
pub mod bind;
pub mod cancel;
pub mod config;
pub mod dc;
pub mod error;
pub mod export;
pub mod history;
pub mod newton;
pub mod op;
pub mod prelude;
pub mod simulation;
pub mod transient;

pub use ac::{AcSweep, SweepType};
pub use cancel::CancellationToken;
pub use config::{IntegrationMethod, SolverConfig};
pub use dc::DcSweep;
pub use export::{ExportPoint, ExportSink, PhasorExportPoint, PhasorExportSink, PhasorVecSink, VecSink};
pub use simulation::Simulation;
pub use transient::TransientAnalysis;
