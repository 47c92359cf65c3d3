//! Shared contracts between the device behaviours (`volt-devices`) and the
//! drivers that own the actual solution vectors and integrator
//! implementations (`volt-solver`). Kept dependency-free of the matrix and
//! solver crates so both can depend on it without a cycle.

use crate::variable::Variable;

/// Newton state machine mode. Narrowed from the four-state `Junction` /
/// `Fix` / `Float` / `Converged` machine to `Float` / `Converged`: this
/// device set has no per-device explicit "off" flag for `Fix` to hold, and
/// the one nonlinear device (the diode) already starts from a
/// representative bias (`v = 0`, already near its off state) under a blind
/// zero guess, so a dedicated off-state assembly pass buys nothing a plain
/// `Float` start doesn't already give. See `DESIGN.md` for the full
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Normal Newton iteration against the actual nonlinear load.
    Float,
    /// The just-converged iterate: handed to `Behavior::accept` on a
    /// committed operating point, DC sweep point, or accepted transient
    /// step, distinguishing a final solution from an exploratory iterate.
    Converged,
}

/// A read-only view onto the current and previous Newton iterate, handed to
/// every behaviour's `load`. Index 0 (ground) always reads as zero.
pub struct IterationState<'a> {
    pub mode: InitMode,
    pub iteration: usize,
    /// Simulation time for a transient step, `None` for OP/DC/AC analyses —
    /// independent sources with a waveform fall back to their DC value then.
    pub time: Option<f64>,
    solution: &'a [f64],
    previous: &'a [f64],
}

impl<'a> IterationState<'a> {
    #[must_use]
    pub fn new(mode: InitMode, iteration: usize, solution: &'a [f64], previous: &'a [f64]) -> Self {
        Self {
            mode,
            iteration,
            time: None,
            solution,
            previous,
        }
    }

    #[must_use]
    pub fn at_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    #[must_use]
    pub fn value(&self, v: Variable) -> f64 {
        if v.is_ground() {
            0.0
        } else {
            self.solution[v.index]
        }
    }

    #[must_use]
    pub fn previous_value(&self, v: Variable) -> f64 {
        if v.is_ground() {
            0.0
        } else {
            self.previous[v.index]
        }
    }
}

/// An offset into a per-device, per-integrator history ring buffer
///. Allocated at `setup`, valid through the
/// simulation, opaque to the device that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSlot(pub usize);

/// The Norton-equivalent companion stamp an integrator produces from a
/// charge/flux state and its derivative w.r.t. the controlling
/// voltage/current: `geq` goes on the matrix diagonal,
/// `ieq` on the RHS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NortonPair {
    pub geq: f64,
    pub ieq: f64,
}

/// Contract every reactive device stamps through. Concrete implementations
/// (Trapezoidal, Gear-2) and the history ring buffer live in `volt-solver`;
/// this trait lets `volt-devices` behaviours call into "whatever integrator
/// the driver selected" without depending on the solver crate.
pub trait Integrator {
    /// Reserves a new history slot for a reactive behaviour.
    fn allocate(&mut self) -> StateSlot;

    /// Seeds a slot's history with the operating-point charge/flux value.
    fn initialize(&mut self, slot: StateSlot, q0: f64);

    /// Given the instantaneous charge/flux `q` and its derivative `dq_dx`
    /// w.r.t. the controlling variable, returns the companion `(geq, ieq)`
    /// stamp for the current time step.
    fn integrate(&mut self, slot: StateSlot, q: f64, dq_dx: f64) -> NortonPair;

    /// Local truncation error estimate for the last `integrate` call on `slot`.
    fn truncation_error(&self, slot: StateSlot) -> f64;
}

/// Out-parameter pair for junction-voltage damping: the
/// limited voltage to use for this iteration, and whether the device wants
/// the outer Newton loop to run at least one more iteration regardless of
/// the ordinary convergence check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitResult {
    pub vd: f64,
    pub force_extra_iteration: bool,
}

/// Classic SPICE `pnjlim` junction-voltage damping rule:
/// if the Newton step would push the junction voltage past `v_crit`, clamp
/// it using the log-exponential smoothing formula instead of taking the
/// raw step. `vt` is the thermal voltage, `v_crit` the junction's critical
/// voltage (`vt * ln(vt / (sqrt(2) * Is))` for a diode).
#[must_use]
pub fn pnjlim(v_new: f64, v_old: f64, vt: f64, v_crit: f64) -> LimitResult {
    if v_new > v_crit && (v_new - v_old).abs() > 2.0 * vt {
        let vd = if v_old > 0.0 {
            let arg = 1.0 + (v_new - v_old) / vt;
            if arg > 0.0 {
                v_old + vt * arg.ln()
            } else {
                v_crit
            }
        } else {
            vt * (v_new / vt).ln()
        };
        LimitResult {
            vd,
            force_extra_iteration: true,
        }
    } else {
        LimitResult {
            vd: v_new,
            force_extra_iteration: false,
        }
    }
}
