//! Transient driver. Solves the operating point at `t=0`, seeds every
//! reactive device's integrator history from it, then walks forward with
//! adaptive step-size control (§4.6): Newton failure or an LTE overrun
//! halves the step and retries; three successive accepted steps allow the
//! step to grow, capped by the per-analysis `max_step` and the LTE-driven
//! suggestion `trtol*sqrt(rel_tol*max|x|/LTE)`. Waveform breakpoints are
//! landed on exactly rather than stepped over.

use volt_core::{Circuit, InitMode, Integrator, IterationState, StateSlot, VariableSet};
use volt_devices::Behavior;
use volt_matrix::RealMatrix;

use crate::cancel::CancellationToken;
use crate::export::{ExportPoint, ExportSink};
use crate::history::ConcreteIntegrator;
use crate::newton;
use crate::prelude::*;

/// A fixed-stop transient sweep. `start` is almost always `0.0`; kept
/// configurable since nothing about the driver actually requires it.
#[derive(Debug, Clone)]
pub struct TransientAnalysis {
    /// Initial (and typical) step size.
    pub step: f64,
    pub stop: f64,
    pub start: f64,
    /// Ceiling the adaptive step size never exceeds.
    pub max_step: f64,
}

fn bind_reactive_state(behaviors: &mut [Box<dyn Behavior>], integrator: &mut ConcreteIntegrator) -> Result<Vec<StateSlot>> {
    let mut reactive_count = 0usize;
    for behavior in behaviors.iter_mut() {
        behavior.bind_state(integrator)?;
        if behavior.is_reactive() {
            reactive_count += 1;
        }
    }
    // `ConcreteIntegrator::allocate` hands out sequential slots starting at
    // 0; since only reactive behaviours call it (exactly once each, from
    // `bind_state`), the i-th reactive behaviour in iteration order owns
    // slot i.
    Ok((0..reactive_count).map(StateSlot).collect())
}

fn worst_truncation_error(integrator: &ConcreteIntegrator, slots: &[StateSlot]) -> f64 {
    slots.iter().map(|&slot| integrator.truncation_error(slot)).fold(0.0_f64, f64::max)
}

pub fn run(circuit: &Circuit, config: &SolverConfig, analysis: &TransientAnalysis, cancel: &CancellationToken, sink: &mut dyn ExportSink) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let (vars, mut behaviors) = crate::op::prepare(circuit, &config.base)?;
    let mut matrix = RealMatrix::new(vars.len());
    for behavior in &mut behaviors {
        behavior.bind_matrix(&mut matrix)?;
    }

    let result = run_inner(&mut behaviors, &mut matrix, &vars, config, analysis, cancel, sink);
    for behavior in &mut behaviors {
        behavior.unsetup();
    }
    result
}

#[allow(clippy::too_many_lines)]
fn run_inner(
    behaviors: &mut [Box<dyn Behavior>],
    matrix: &mut RealMatrix,
    vars: &VariableSet,
    config: &SolverConfig,
    analysis: &TransientAnalysis,
    cancel: &CancellationToken,
    sink: &mut dyn ExportSink,
) -> Result<()> {
    let base = &config.base;

    let op_solution = crate::op::solve(behaviors, matrix, vars, config, cancel)?;

    let mut integrator = ConcreteIntegrator::new(config.integration_method);
    let reactive_slots = bind_reactive_state(behaviors, &mut integrator)?;

    let init_state = IterationState::new(InitMode::Float, 0, &op_solution, &op_solution);
    for behavior in behaviors.iter_mut() {
        behavior.initialize_reactive(&init_state, &mut integrator);
    }

    let mut breakpoints: Vec<f64> = behaviors.iter().flat_map(|b| b.breakpoints(analysis.stop)).filter(|&t| t > analysis.start).collect();
    breakpoints.sort_by(|a, b| a.partial_cmp(b).unwrap());
    breakpoints.dedup_by(|a, b| (*a - *b).abs() < 1e-15);

    let mut time = analysis.start;
    let mut last_solution = op_solution;
    let mut dt = analysis.step.min(analysis.max_step);
    let mut successive_accepts: u32 = 0;

    sink.accept(ExportPoint { time: Some(time), values: crate::op::export_values(vars, &last_solution) });

    while time < analysis.stop - 1e-15 {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let next_breakpoint = breakpoints.iter().copied().find(|&bp| bp > time + 1e-15);
        let mut target = (time + dt).min(analysis.stop);
        if let Some(bp) = next_breakpoint {
            if bp < target {
                target = bp;
            }
        }
        let mut h = target - time;
        if h <= 0.0 {
            break;
        }

        let solution;
        let mut last_residual = f64::NAN;
        loop {
            if h < config.dt_min {
                return Err(Error::NoConvergence { residual: last_residual, step_size: h });
            }
            integrator.set_step(h);
            let outcome = newton::newton_iterate_transient(
                behaviors,
                matrix,
                vars,
                base,
                time + h,
                base.itl4,
                last_solution.clone(),
                &mut integrator,
                cancel,
            );
            match outcome {
                Ok((candidate, _iterations)) => {
                    let max_lte = worst_truncation_error(&integrator, &reactive_slots);
                    if max_lte > base.trtol * base.chgtol {
                        log::info!("lte overrun at t={}, halving step to {}", time + h, h / 2.0);
                        integrator.reject_step();
                        h /= 2.0;
                        continue;
                    }
                    solution = candidate;
                    break;
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(Error::NoConvergence { residual, .. }) => {
                    log::warn!("newton failed to converge at t={}, halving step to {}", time + h, h / 2.0);
                    last_residual = residual;
                    integrator.reject_step();
                    h /= 2.0;
                }
                Err(err) => return Err(err),
            }
        }

        time += h;
        integrator.accept_step();
        let committed_state = IterationState::new(InitMode::Converged, 0, &solution, &solution).at_time(time);
        for behavior in behaviors.iter_mut() {
            behavior.accept(&committed_state);
        }
        last_solution = solution;
        successive_accepts += 1;

        let max_lte = worst_truncation_error(&integrator, &reactive_slots);
        let max_x = last_solution.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1e-12);
        let suggested = if max_lte > 0.0 {
            base.trtol * (base.rel_tol * max_x / max_lte).sqrt()
        } else {
            analysis.max_step
        };
        let mut proposed = suggested.min(analysis.max_step).max(config.dt_min);
        if proposed > h {
            if successive_accepts < 3 {
                proposed = h;
            } else {
                successive_accepts = 0;
            }
        }
        dt = proposed;

        sink.accept(ExportPoint { time: Some(time), values: crate::op::export_values(vars, &last_solution) });
    }
    Ok(())
}
