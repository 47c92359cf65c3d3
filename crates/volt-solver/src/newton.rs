//! Newton-Raphson iteration shared by every driver: the per-variable
//! convergence test (§4.5) and two iterate loops, one for analyses with no
//! time axis (OP/DC/AC linearisation) and one for a single accepted
//! transient step.

use volt_core::{BaseConfiguration, InitMode, Integrator, IterationState, VariableKind, VariableSet};
use volt_devices::Behavior;
use volt_matrix::RealMatrix;

use crate::cancel::CancellationToken;
use crate::prelude::*;

/// Per-variable convergence test: every voltage must settle within
/// `relTol*max(|v|,|v_prev|) + vntol`, every branch current within
/// `absTol`. Returns `false` immediately (forcing at least one more
/// iteration) if `previous` is empty, matching the first-iteration case
/// where there is nothing yet to compare against.
#[must_use]
pub fn convergence_check(solution: &[f64], previous: &[f64], vars: &VariableSet, config: &BaseConfiguration) -> bool {
    if previous.is_empty() {
        return false;
    }
    for index in 1..vars.len() {
        let delta = (solution[index] - previous[index]).abs();
        let tolerance = match vars.kind(index) {
            VariableKind::Voltage | VariableKind::Temperature => {
                config.rel_tol * solution[index].abs().max(previous[index].abs()) + config.vntol
            }
            VariableKind::Current => config.abs_tol,
        };
        if delta > tolerance {
            return false;
        }
    }
    true
}

fn gmin_diagonal_handles(matrix: &mut RealMatrix, vars: &VariableSet) -> Vec<volt_matrix::ElementHandle> {
    (1..vars.len())
        .filter(|&index| vars.kind(index) == VariableKind::Voltage)
        .map(|index| matrix.get_element(index, index))
        .collect()
}

/// Runs Newton's method to convergence (or `max_iterations` exhaustion) for
/// an analysis with no time axis: OP, a single DC sweep point, or the
/// linearisation pass ahead of AC. `extra_gmin` stamps an additional shunt
/// conductance to ground on every non-ground voltage node, for the OP
/// driver's Gmin-stepping recovery ladder; pass `0.0` outside of it.
///
/// The returned iteration count is the number of passes whose stamped
/// matrix actually depended on the previous guess -- i.e. it excludes the
/// very first assembly, which is always measured against the blind initial
/// guess and so can never itself be recognised as converged. A purely
/// linear circuit's stamps never depend on the iterate, so its first
/// assembly already lands on the exact answer and the very next pass
/// confirms it unchanged: that confirming pass is the "one iteration" of
/// §8's convergence guarantee (P7).
pub fn newton_iterate(
    behaviors: &mut [Box<dyn Behavior>],
    matrix: &mut RealMatrix,
    vars: &VariableSet,
    config: &BaseConfiguration,
    max_iterations: usize,
    initial: Vec<f64>,
    extra_gmin: f64,
    cancel: &CancellationToken,
) -> Result<(Vec<f64>, usize)> {
    let gmin_handles = gmin_diagonal_handles(matrix, vars);
    let mut previous: Vec<f64> = Vec::new();
    let mut solution = initial;

    for iteration in 0..max_iterations {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        matrix.reset();
        let state = IterationState::new(InitMode::Float, iteration, &solution, &previous_or(&previous, &solution));
        for behavior in behaviors.iter_mut() {
            behavior.load(&state, matrix, config)?;
        }
        if extra_gmin > 0.0 {
            for &handle in &gmin_handles {
                matrix.stamp(handle, extra_gmin);
            }
        }

        let factorization = matrix.factor(config.pivot_abs_tol)?;
        let next = matrix.solve(&factorization);

        let converged = iteration > 0
            && convergence_check(&next, &solution, vars, config)
            && behaviors.iter().all(|b| b.is_convergent(&state, config));

        previous = solution;
        solution = next;
        if converged {
            return Ok((solution, iteration));
        }
    }

    let residual = if previous.is_empty() { f64::NAN } else { max_abs_delta(&solution, &previous) };
    Err(Error::NoConvergence { residual, step_size: 0.0 })
}

/// Largest per-variable magnitude of `a - b`, used to report the residual a
/// Newton loop exhausted its iteration budget with.
fn max_abs_delta(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
}

fn previous_or(previous: &[f64], solution: &[f64]) -> Vec<f64> {
    if previous.is_empty() {
        solution.to_vec()
    } else {
        previous.to_vec()
    }
}

/// Runs Newton's method for one transient step landing at `time`, stamping
/// reactive devices through `load_reactive` against the shared `integrator`
/// and every other device through plain `load`. Does not call
/// `Integrator::accept`/`reject_step` or `Behavior::accept` -- that is the
/// transient driver's responsibility once it decides whether to keep the
/// step.
#[allow(clippy::too_many_arguments)]
pub fn newton_iterate_transient(
    behaviors: &mut [Box<dyn Behavior>],
    matrix: &mut RealMatrix,
    vars: &VariableSet,
    config: &BaseConfiguration,
    time: f64,
    max_iterations: usize,
    initial: Vec<f64>,
    integrator: &mut dyn Integrator,
    cancel: &CancellationToken,
) -> Result<(Vec<f64>, usize)> {
    let mut previous: Vec<f64> = Vec::new();
    let mut solution = initial;

    for iteration in 0..max_iterations {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        matrix.reset();
        let state = IterationState::new(InitMode::Float, iteration, &solution, &previous_or(&previous, &solution)).at_time(time);
        for behavior in behaviors.iter_mut() {
            if behavior.is_reactive() {
                behavior.load_reactive(&state, matrix, integrator, config)?;
            } else {
                behavior.load(&state, matrix, config)?;
            }
        }

        let factorization = matrix.factor(config.pivot_abs_tol)?;
        let next = matrix.solve(&factorization);

        let converged = convergence_check(&next, &solution, vars, config)
            && behaviors.iter().all(|b| b.is_convergent(&state, config));

        previous = solution;
        solution = next;
        if converged {
            return Ok((solution, iteration + 1));
        }
    }

    let residual = if previous.is_empty() { f64::NAN } else { max_abs_delta(&solution, &previous) };
    Err(Error::NoConvergence { residual, step_size: 0.0 })
}
