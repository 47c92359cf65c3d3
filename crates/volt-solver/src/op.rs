//! Operating-point driver. Binds a circuit, then walks the full
//! convergence-recovery ladder from §4.5: plain Newton, then source
//! stepping (0 -> 1 over `src_steps` substeps), then Gmin stepping (a
//! geometrically decreasing shunt conductance on every node), then gives
//! up. Also the linearisation step AC analysis runs before its frequency
//! sweep.

use std::collections::HashMap;

use volt_core::{BaseConfiguration, Circuit, InitMode, IterationState, VariableSet};
use volt_devices::Behavior;
use volt_matrix::RealMatrix;

use crate::cancel::CancellationToken;
use crate::export::{ExportPoint, ExportSink};
use crate::newton;
use crate::prelude::*;

pub(crate) fn prepare(circuit: &Circuit, config: &BaseConfiguration) -> Result<(VariableSet, Vec<Box<dyn Behavior>>)> {
    let mut vars = VariableSet::new();
    let mut behaviors = crate::bind::bind(circuit, &mut vars)?;
    for behavior in &mut behaviors {
        behavior.temperature_update(config)?;
    }
    Ok((vars, behaviors))
}

/// Solves for the DC operating point of an already-bound circuit. `matrix`
/// must already have every behaviour's real-valued handles requested via
/// `bind_matrix`.
pub fn solve(
    behaviors: &mut [Box<dyn Behavior>],
    matrix: &mut RealMatrix,
    vars: &VariableSet,
    config: &SolverConfig,
    cancel: &CancellationToken,
) -> Result<Vec<f64>> {
    let base = &config.base;
    let zeros = vec![0.0; vars.len()];

    match newton::newton_iterate(behaviors, matrix, vars, base, base.itl1, zeros.clone(), 0.0, cancel) {
        Ok((solution, iterations)) => {
            log::info!("operating point converged directly in {iterations} iterations");
            finalize(behaviors, &solution);
            return Ok(solution);
        }
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(_) => log::warn!("operating point did not converge directly, attempting source stepping"),
    }

    let mut guess = zeros.clone();
    let mut source_stepping_ok = true;
    let mut last_failure = Error::NoConvergence { residual: f64::NAN, step_size: 0.0 };
    for step in 1..=base.src_steps {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let scale = step as f64 / base.src_steps as f64;
        for behavior in behaviors.iter_mut() {
            behavior.set_source_scale(scale);
        }
        match newton::newton_iterate(behaviors, matrix, vars, base, base.itl1, guess.clone(), 0.0, cancel) {
            Ok((solution, _)) => guess = solution,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(err) => {
                source_stepping_ok = false;
                last_failure = err;
                break;
            }
        }
    }
    for behavior in behaviors.iter_mut() {
        behavior.set_source_scale(1.0);
    }
    if source_stepping_ok {
        log::info!("operating point converged via source stepping");
        finalize(behaviors, &guess);
        return Ok(guess);
    }
    log::warn!("source stepping failed, attempting gmin stepping");

    let mut guess = zeros;
    let initial_gmin = 1.0;
    let mut gmin_stepping_ok = true;
    for step in 0..=base.gmin_steps {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let fraction = step as f64 / base.gmin_steps as f64;
        let extra_gmin = initial_gmin * (base.gmin / initial_gmin).powf(fraction);
        match newton::newton_iterate(behaviors, matrix, vars, base, base.itl1, guess.clone(), extra_gmin, cancel) {
            Ok((solution, _)) => guess = solution,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(err) => {
                gmin_stepping_ok = false;
                last_failure = err;
                break;
            }
        }
    }
    if !gmin_stepping_ok {
        return Err(last_failure);
    }
    let (solution, iterations) = newton::newton_iterate(behaviors, matrix, vars, base, base.itl1, guess, 0.0, cancel)?;
    log::info!("operating point converged via gmin stepping, {iterations} final iterations");
    finalize(behaviors, &solution);
    Ok(solution)
}

/// Tags `solution` as the converged iterate and notifies every behaviour,
/// the same end-of-commit signal a transient driver sends on an accepted
/// step. Called exactly once per successful solve, never from within a
/// stepping ladder's intermediate substeps.
fn finalize(behaviors: &mut [Box<dyn Behavior>], solution: &[f64]) {
    let converged_state = IterationState::new(InitMode::Converged, 0, solution, solution);
    for behavior in behaviors.iter_mut() {
        behavior.accept(&converged_state);
    }
}

pub(crate) fn export_values(vars: &VariableSet, solution: &[f64]) -> HashMap<String, f64> {
    vars.iter()
        .filter(|(_, v)| !v.is_ground())
        .map(|(name, v)| (name.to_string(), solution[v.index]))
        .collect()
}

/// Standalone operating-point analysis: binds the circuit, solves, emits a
/// single export point with `time = None`, and releases every behaviour
/// before returning.
pub fn run(circuit: &Circuit, config: &SolverConfig, cancel: &CancellationToken, sink: &mut dyn ExportSink) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let (vars, mut behaviors) = prepare(circuit, &config.base)?;
    let mut matrix = RealMatrix::new(vars.len());
    for behavior in &mut behaviors {
        behavior.bind_matrix(&mut matrix)?;
    }

    let result = solve(&mut behaviors, &mut matrix, &vars, config, cancel);
    for behavior in &mut behaviors {
        behavior.unsetup();
    }
    let solution = result?;
    sink.accept(ExportPoint { time: None, values: export_values(&vars, &solution) });
    Ok(())
}
