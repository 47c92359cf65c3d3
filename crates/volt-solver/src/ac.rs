//! AC small-signal sweep driver. Linearises the circuit at its operating
//! point (reusing `op::solve` against the real matrix), then stamps and
//! factors a complex admittance matrix once per swept frequency. A
//! nonlinear device's AC stamp is exactly its Jacobian at the operating
//! point, which `load_frequency` reads from state cached by the most
//! recent `load` call.

use std::collections::HashMap;
use std::f64::consts::TAU;

use faer::c64;
use volt_core::{Circuit, InitMode, IterationState, VariableSet};
use volt_devices::Behavior;
use volt_matrix::{ComplexMatrix, RealMatrix};

use crate::cancel::CancellationToken;
use crate::export::{PhasorExportPoint, PhasorExportSink};
use crate::prelude::*;

/// Frequency-axis spacing for an AC sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepType {
    Linear,
    Decade,
    Octave,
}

#[derive(Debug, Clone)]
pub struct AcSweep {
    pub sweep: SweepType,
    /// Points per decade/octave for `Decade`/`Octave`; total point count for `Linear`.
    pub points: usize,
    pub fstart: f64,
    pub fstop: f64,
}

impl AcSweep {
    /// The frequency grid this sweep covers, ascending, inclusive of both ends.
    #[must_use]
    pub fn frequencies(&self) -> Vec<f64> {
        if self.points == 0 || self.fstop <= self.fstart || self.fstart <= 0.0 {
            return vec![self.fstart];
        }
        match self.sweep {
            SweepType::Linear => {
                let step = (self.fstop - self.fstart) / self.points as f64;
                (0..=self.points).map(|i| self.fstart + i as f64 * step).collect()
            }
            SweepType::Decade | SweepType::Octave => {
                let base = if self.sweep == SweepType::Decade { 10.0 } else { 2.0 };
                let decades = (self.fstop / self.fstart).log(base);
                let total_points = ((decades * self.points as f64).round() as usize).max(1);
                let log_step = decades / total_points as f64;
                (0..=total_points).map(|i| self.fstart * base.powf(i as f64 * log_step)).collect()
            }
        }
    }
}

fn export_values(vars: &VariableSet, solution: &[c64]) -> HashMap<String, c64> {
    vars.iter()
        .filter(|(_, v)| !v.is_ground())
        .map(|(name, v)| (name.to_string(), solution[v.index]))
        .collect()
}

fn linearise_and_sweep(
    behaviors: &mut [Box<dyn Behavior>],
    matrix: &mut RealMatrix,
    vars: &VariableSet,
    config: &SolverConfig,
    sweep: &AcSweep,
    cancel: &CancellationToken,
    sink: &mut dyn PhasorExportSink,
) -> Result<()> {
    log::info!("linearising operating point for ac analysis");
    let op_solution = crate::op::solve(behaviors, matrix, vars, config, cancel)?;

    // Re-run `load` once more at the converged point so every nonlinear
    // device's cached small-signal state (e.g. a diode's `gd`) reflects the
    // final iterate, not whichever one happened to trip convergence.
    let zeros = vec![0.0; vars.len()];
    let op_state = IterationState::new(InitMode::Float, 0, &op_solution, &zeros);
    matrix.reset();
    for behavior in behaviors.iter_mut() {
        behavior.load(&op_state, matrix, &config.base)?;
    }

    let mut complex_matrix = ComplexMatrix::new(vars.len());
    for behavior in behaviors.iter_mut() {
        behavior.bind_matrix_ac(&mut complex_matrix)?;
    }

    for frequency in sweep.frequencies() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if frequency <= 0.0 {
            log::warn!("skipping non-positive frequency {frequency}");
            continue;
        }
        let omega = TAU * frequency;
        complex_matrix.reset();
        for behavior in behaviors.iter_mut() {
            behavior.load_frequency(omega, &mut complex_matrix)?;
        }
        let factorization = complex_matrix.factor(config.base.pivot_abs_tol)?;
        let solution = complex_matrix.solve(&factorization);
        sink.accept(PhasorExportPoint { frequency, values: export_values(vars, &solution) });
    }
    Ok(())
}

pub fn run(circuit: &Circuit, config: &SolverConfig, sweep: &AcSweep, cancel: &CancellationToken, sink: &mut dyn PhasorExportSink) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let (vars, mut behaviors) = crate::op::prepare(circuit, &config.base)?;
    let mut matrix = RealMatrix::new(vars.len());
    for behavior in &mut behaviors {
        behavior.bind_matrix(&mut matrix)?;
    }

    let result = linearise_and_sweep(&mut behaviors, &mut matrix, &vars, config, sweep, cancel, sink);
    for behavior in &mut behaviors {
        behavior.unsetup();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use volt_core::{Entity, ParameterSet};

    fn resistor(name: &str, pos: &str, neg: &str, ohms: f64) -> Entity {
        let mut params = ParameterSet::new();
        params.set("r", ohms);
        Entity::new(name, "R", vec![pos.to_string(), neg.to_string()], params)
    }

    fn capacitor(name: &str, pos: &str, neg: &str, farads: f64) -> Entity {
        let mut params = ParameterSet::new();
        params.set("c", farads);
        Entity::new(name, "C", vec![pos.to_string(), neg.to_string()], params)
    }

    fn voltage_source(name: &str, pos: &str, neg: &str, dc: f64, acmag: f64) -> Entity {
        let mut params = ParameterSet::new();
        params.set("dc", dc);
        params.set("acmag", acmag);
        Entity::new(name, "V", vec![pos.to_string(), neg.to_string()], params)
    }

    #[test]
    fn linear_sweep_covers_the_requested_endpoints() {
        let sweep = AcSweep { sweep: SweepType::Linear, points: 4, fstart: 10.0, fstop: 50.0 };
        let freqs = sweep.frequencies();
        assert_eq!(freqs.len(), 5);
        assert!((freqs[0] - 10.0).abs() < 1e-9);
        assert!((freqs[4] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn decade_sweep_spans_the_requested_decades() {
        let sweep = AcSweep { sweep: SweepType::Decade, points: 10, fstart: 1.0, fstop: 100.0 };
        let freqs = sweep.frequencies();
        assert!((freqs[0] - 1.0).abs() < 1e-9);
        assert!((freqs.last().unwrap() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn rc_low_pass_matches_closed_form_divider_at_one_frequency() {
        let mut circuit = Circuit::new();
        circuit.add(voltage_source("v1", "in", "0", 0.0, 1.0)).unwrap();
        circuit.add(resistor("r1", "in", "out", 1000.0)).unwrap();
        circuit.add(capacitor("c1", "out", "0", 1.0e-6)).unwrap();

        let config = SolverConfig::default();
        let sweep = AcSweep { sweep: SweepType::Linear, points: 1, fstart: 1000.0, fstop: 1000.0 };
        let cancel = CancellationToken::new();
        let mut sink = crate::export::PhasorVecSink::default();
        run(&circuit, &config, &sweep, &cancel, &mut sink).unwrap();

        let omega = TAU * 1000.0;
        let g = 1.0 / 1000.0;
        let expected = c64::new(g, 0.0) / (c64::new(g, 0.0) + c64::new(0.0, omega * 1.0e-6));
        let got = sink.points[0].values["out"];
        assert!((got - expected).norm() < 1e-6);
    }
}
