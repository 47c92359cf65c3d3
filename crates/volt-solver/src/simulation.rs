//! The four analysis kinds a bound circuit can run (§6.1), collected
//! behind one enum so a caller holding a `Circuit` + `SolverConfig` can
//! pick an analysis without reaching into `op`/`dc`/`ac`/`transient`
//! directly. AC is driven separately through [`Simulation::run_ac`] since
//! its export points are phasor-valued, not real.

use volt_core::Circuit;

use crate::ac::AcSweep;
use crate::cancel::CancellationToken;
use crate::dc::DcSweep;
use crate::export::{ExportSink, PhasorExportSink};
use crate::prelude::*;
use crate::transient::TransientAnalysis;

/// A single analysis to run against a circuit.
pub enum Simulation {
    OperatingPoint,
    Dc(DcSweep),
    Ac(AcSweep),
    Transient(TransientAnalysis),
}

impl Simulation {
    /// Runs an OP, DC, or transient analysis, handing every solved point to
    /// `sink` as it is produced. Calling this with `Simulation::Ac` is a
    /// logic error -- AC's export points are complex-valued and go through
    /// [`Simulation::run_ac`] instead.
    pub fn run(&self, circuit: &Circuit, config: &SolverConfig, cancel: &CancellationToken, sink: &mut dyn ExportSink) -> Result<()> {
        match self {
            Simulation::OperatingPoint => crate::op::run(circuit, config, cancel, sink),
            Simulation::Dc(sweep) => crate::dc::run(circuit, config, sweep, cancel, sink),
            Simulation::Transient(analysis) => crate::transient::run(circuit, config, analysis, cancel, sink),
            Simulation::Ac(sweep) => {
                // A caller who only has an `ExportSink` cannot consume phasor
                // points; fail fast rather than silently dropping imaginary parts.
                let _ = sweep;
                Err(Error::NotSweepable("AC analysis produces phasor export points; call Simulation::run_ac instead".to_string()))
            }
        }
    }

    /// Runs the AC sweep carried by `Simulation::Ac`, handing every solved
    /// phasor point to `sink`. Returns `Error::NotSweepable` for any other
    /// variant.
    pub fn run_ac(&self, circuit: &Circuit, config: &SolverConfig, cancel: &CancellationToken, sink: &mut dyn PhasorExportSink) -> Result<()> {
        match self {
            Simulation::Ac(sweep) => crate::ac::run(circuit, config, sweep, cancel, sink),
            _ => Err(Error::NotSweepable("not an AC analysis".to_string())),
        }
    }
}
