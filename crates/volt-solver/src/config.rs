//! Solver-wide configuration, threaded by reference through every driver
//! and (via `BaseConfiguration`) every behaviour's `load`.

use volt_core::BaseConfiguration;

/// Which companion-model formula the transient driver's integrator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// Second-order, A-stable for linear problems. Default.
    Trapezoidal,
    /// Backward differentiation, order ramps from 1 at the first accepted point.
    Gear2,
}

/// Configuration structure for controlling solver parameters across
/// different simulation types. Wraps the SPICE-compatible numerical
/// defaults in `base` and adds the transient step-control knobs the
/// teacher's fixed-step driver never needed.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Shared numerical tolerances and iteration limits.
    pub base: BaseConfiguration,

    /// Which integrator the transient driver uses for reactive devices.
    pub integration_method: IntegrationMethod,

    /// Floor on the adaptive transient step size.
    pub dt_min: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base: BaseConfiguration::default(),
            integration_method: IntegrationMethod::Trapezoidal,
            dt_min: 1e-12,
        }
    }
}
