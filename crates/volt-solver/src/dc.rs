//! DC sweep driver. The original spec's `DC { sources, start, stop, step }`
//! is narrowed to a single swept source here -- see `DESIGN.md` for why.
//! Each point clones the circuit, overwrites the swept source's `dc`
//! parameter, rebinds from scratch, and warm-starts its Newton loop from
//! the previous point's solution.

use volt_core::{Circuit, InitMode, IterationState};
use volt_devices::Behavior;
use volt_matrix::RealMatrix;

use crate::cancel::CancellationToken;
use crate::export::{ExportPoint, ExportSink};
use crate::newton;
use crate::prelude::*;

/// Sweeps a single named voltage or current source's `dc` parameter from
/// `start` to `stop` in steps of `step` (same sign as `stop - start`).
#[derive(Debug, Clone)]
pub struct DcSweep {
    pub source: String,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl DcSweep {
    fn points(&self) -> Vec<f64> {
        if self.step == 0.0 {
            return vec![self.start];
        }
        let span = self.stop - self.start;
        let steps = (span / self.step).abs().round() as usize;
        let signed_step = if span >= 0.0 { self.step.abs() } else { -self.step.abs() };
        (0..=steps).map(|i| self.start + i as f64 * signed_step).collect()
    }
}

pub fn run(circuit: &Circuit, config: &SolverConfig, sweep: &DcSweep, cancel: &CancellationToken, sink: &mut dyn ExportSink) -> Result<()> {
    if circuit.lookup(&sweep.source).is_none() {
        return Err(Error::NotSweepable(sweep.source.clone()));
    }

    let mut warm_start: Option<Vec<f64>> = None;

    for value in sweep.points() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut point_circuit = circuit.clone();
        point_circuit
            .lookup_mut(&sweep.source)
            .expect("presence already checked above")
            .parameters_mut()
            .set("dc", value);

        let (vars, mut behaviors) = crate::op::prepare(&point_circuit, &config.base)?;
        let mut matrix = RealMatrix::new(vars.len());
        for behavior in &mut behaviors {
            behavior.bind_matrix(&mut matrix)?;
        }

        let initial = warm_start.clone().unwrap_or_else(|| vec![0.0; vars.len()]);
        let result = newton::newton_iterate(&mut behaviors, &mut matrix, &vars, &config.base, config.base.itl2, initial, 0.0, cancel);

        if let Ok((solution, iterations)) = &result {
            log::info!("dc sweep point {}={value} converged in {iterations} iterations", sweep.source);
            let converged_state = IterationState::new(InitMode::Converged, 0, solution, solution);
            for behavior in &mut behaviors {
                behavior.accept(&converged_state);
            }
        }
        for behavior in &mut behaviors {
            behavior.unsetup();
        }
        let (solution, _iterations) = result?;

        warm_start = Some(solution.clone());
        sink.accept(ExportPoint { time: None, values: crate::op::export_values(&vars, &solution) });
    }
    Ok(())
}
