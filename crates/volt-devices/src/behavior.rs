//! The behaviour contract every device in this library implements.
//!
//! The upstream framework binds one behaviour object per (device, analysis
//! kind) pair and sequences them topologically. A representative device set
//! this small gets the same guarantees with less machinery: one behaviour
//! object per device instance, exposing a default (no-op) method for each
//! analysis kind it does not participate in. A resistor overrides `load`
//! and nothing else; a capacitor overrides `load` and `load_frequency` and
//! participates in the integrator; a CCCS overrides `setup` to resolve its
//! controlling source's branch variable before anything else runs.

use volt_core::{BaseConfiguration, Integrator, IterationState, Variable};
use volt_matrix::{ComplexMatrix, RealMatrix};

use crate::prelude::*;

/// Construction-time lookup of another entity's branch-current variable,
/// used by controlled sources to resolve their controlling voltage source.
/// Implemented by whatever registry the driver builds after topologically
/// sorting entities by named reference.
pub trait SiblingLookup {
    fn branch_variable(&self, entity_name: &str) -> Option<Variable>;
}

/// A device's full analysis-kind behaviour set, realized as one object with
/// default no-op methods rather than a family of marker traits.
pub trait Behavior {
    fn name(&self) -> &str;

    /// If this device introduces a branch-current unknown (a voltage
    /// source, or a current-controlled source reusing one), its variable is
    /// exposed here so dependent behaviours can resolve it through
    /// [`SiblingLookup`].
    fn branch_variable(&self) -> Option<Variable> {
        None
    }

    /// Recomputes temperature-dependent derived parameters (e.g. a
    /// resistor's TC1/TC2-scaled effective resistance) against the circuit's
    /// operating temperature. Runs once per simulation, before `setup`.
    fn temperature_update(&mut self, _config: &BaseConfiguration) -> Result<()> {
        Ok(())
    }

    /// Reads parameter sets and resolves sibling references (e.g. a
    /// controlled source looks up its controlling source's branch
    /// variable). Runs once, in topological order of named references.
    fn setup(&mut self, _siblings: &dyn SiblingLookup) -> Result<()> {
        Ok(())
    }

    /// Allocates any internal nodes or branch variables this device needs
    /// beyond its external pins (e.g. a diode's internal `pos'` node when
    /// series resistance is nonzero).
    fn bind_variables(&mut self, _vars: &mut volt_core::VariableSet) -> Result<()> {
        Ok(())
    }

    /// Requests every real-valued matrix/RHS handle this device's `load`
    /// will stamp into.
    fn bind_matrix(&mut self, _matrix: &mut RealMatrix) -> Result<()> {
        Ok(())
    }

    /// Requests the complex-valued matrix/RHS handles used during AC
    /// analysis. Most devices reuse the same coordinates as `bind_matrix`;
    /// reactive devices additionally need their admittance cell.
    fn bind_matrix_ac(&mut self, _matrix: &mut ComplexMatrix) -> Result<()> {
        Ok(())
    }

    /// Reserves a history slot from the active integrator. Only reactive
    /// (`TimeDerivative`) devices override this.
    fn bind_state(&mut self, _integrator: &mut dyn Integrator) -> Result<()> {
        Ok(())
    }

    /// Seeds this device's history slot with its charge/flux at the
    /// operating point, before the first transient step. `state` carries the
    /// just-solved OP solution as both its current and previous iterate.
    /// Only reactive (`TimeDerivative`) devices override this.
    fn initialize_reactive(&mut self, _state: &IterationState, _integrator: &mut dyn Integrator) {}

    /// True for devices with a `TimeDerivative` behaviour (a capacitor or
    /// inductor). The transient driver calls `load_reactive` instead of
    /// `load` for these; every other device keeps stamping through `load`
    /// as it does for OP/DC/AC.
    fn is_reactive(&self) -> bool {
        false
    }

    /// Stamps this device's contribution for the current Newton iteration.
    fn load(&mut self, _state: &IterationState, _matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        Ok(())
    }

    /// Stamps the Norton-equivalent companion contribution of a reactive
    /// (`TimeDerivative`) device for the current transient step, via the
    /// driver's active integrator. Not called during OP/DC/AC analyses,
    /// where a reactive device instead relies on its plain `load` (open
    /// circuit for a capacitor, a hard zero-volt short for an inductor).
    fn load_reactive(
        &mut self,
        _state: &IterationState,
        _matrix: &mut RealMatrix,
        _integrator: &mut dyn Integrator,
        _config: &BaseConfiguration,
    ) -> Result<()> {
        Ok(())
    }

    /// Stamps this device's small-signal admittance contribution at
    /// angular frequency `omega`, linearised around the operating point
    /// captured by the most recent `load`.
    fn load_frequency(&mut self, _omega: f64, _matrix: &mut ComplexMatrix) -> Result<()> {
        Ok(())
    }

    /// Per-device convergence test beyond the driver's own `|Δx|` check
    /// (e.g. a diode comparing its linear-extrapolated current against the
    /// actual nonlinear current).
    fn is_convergent(&self, _state: &IterationState, _config: &BaseConfiguration) -> bool {
        true
    }

    /// End-of-timestep commit notification; only called once a transient
    /// step is accepted, never on a rejected trial step.
    fn accept(&mut self, _state: &IterationState) {}

    /// Scales this device's independent source value by `scale` (0.0..=1.0).
    /// Default no-op; only independent voltage/current sources override it,
    /// for the Newton driver's source-stepping convergence recovery ladder.
    fn set_source_scale(&mut self, _scale: f64) {}

    /// Breakpoint times (edges / segment boundaries) this device's waveform
    /// publishes up to `upto` seconds, which the transient driver guarantees
    /// a step lands on exactly. Default empty; only independent sources
    /// carrying a [`volt_core::Waveform`] override it.
    fn breakpoints(&self, _upto: f64) -> Vec<f64> {
        Vec::new()
    }

    /// Releases any resources acquired during `setup`/`bind_*`. Handles
    /// issued by a matrix become invalid once its generation is bumped;
    /// this hook exists for devices that hold onto something else.
    fn unsetup(&mut self) {}
}
