//! Concrete history-ring-buffer integrators: Trapezoidal (default) and
//! Gear-2 (backward differentiation, order ramps from 1 at the first
//! accepted point). Both implement `volt_core::Integrator`; the transient
//! driver additionally calls the inherent `set_step`/`accept_step`/
//! `reject_step` methods, which sit outside that trait since OP/DC/AC never
//! need them.

use volt_core::{Integrator, NortonPair, StateSlot};

#[derive(Debug, Clone, Copy, Default)]
struct SlotHistory {
    /// Charge/flux at the last accepted time point.
    q1: f64,
    /// Charge/flux two accepted time points back (Gear-2 only).
    q2: f64,
    /// Derivative (current/voltage) at the last accepted time point.
    i1: f64,
    /// Charge/flux and derivative computed by the most recent `integrate`
    /// call, not yet committed; `accept_step` rotates these into `q1`/`i1`.
    pending_q: f64,
    pending_i: f64,
    pending_lte: f64,
    steps_taken: u32,
}

/// Second-order, A-stable (for linear problems) trapezoidal rule:
/// `dq/dt(t) ~= (2/h)(q(t) - q(t-1)) - dq/dt(t-1)`.
pub struct Trapezoidal {
    slots: Vec<SlotHistory>,
    h: f64,
}

impl Trapezoidal {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new(), h: 1e-6 }
    }
}

impl Default for Trapezoidal {
    fn default() -> Self {
        Self::new()
    }
}

impl Trapezoidal {
    /// Sets the step size used by the next round of `integrate` calls.
    pub fn set_step(&mut self, h: f64) {
        self.h = h;
    }

    /// Commits every slot's pending (converged) charge/derivative as the new
    /// history point, on a successfully accepted transient step.
    pub fn accept_step(&mut self) {
        for slot in &mut self.slots {
            slot.q1 = slot.pending_q;
            slot.i1 = slot.pending_i;
            slot.steps_taken += 1;
        }
    }

    /// A rejected trial step recomputes `pending_q`/`pending_i` from
    /// scratch at a smaller `h`; there is nothing to roll back here.
    pub fn reject_step(&mut self) {}
}

impl Integrator for Trapezoidal {
    fn allocate(&mut self) -> StateSlot {
        let index = self.slots.len();
        self.slots.push(SlotHistory::default());
        StateSlot(index)
    }

    fn initialize(&mut self, slot: StateSlot, q0: f64) {
        let s = &mut self.slots[slot.0];
        s.q1 = q0;
        s.q2 = q0;
        s.i1 = 0.0;
        s.steps_taken = 0;
    }

    fn integrate(&mut self, slot: StateSlot, q: f64, dq_dx: f64) -> NortonPair {
        let s = &mut self.slots[slot.0];
        let geq = (2.0 / self.h) * dq_dx;
        let ieq = (2.0 / self.h) * s.q1 + s.i1;
        let i_now = (2.0 / self.h) * (q - s.q1) - s.i1;
        s.pending_q = q;
        s.pending_i = i_now;
        s.pending_lte = (self.h / 12.0) * (i_now - s.i1).abs();
        NortonPair { geq, ieq }
    }

    fn truncation_error(&self, slot: StateSlot) -> f64 {
        self.slots[slot.0].pending_lte
    }
}

/// Backward-differentiation formula, order 1 (backward Euler) for the first
/// accepted step after `initialize`, order 2 afterward.
pub struct Gear2 {
    slots: Vec<SlotHistory>,
    h: f64,
}

impl Gear2 {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new(), h: 1e-6 }
    }
}

impl Default for Gear2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Gear2 {
    pub fn set_step(&mut self, h: f64) {
        self.h = h;
    }

    pub fn accept_step(&mut self) {
        for slot in &mut self.slots {
            slot.q2 = slot.q1;
            slot.q1 = slot.pending_q;
            slot.i1 = slot.pending_i;
            slot.steps_taken += 1;
        }
    }

    pub fn reject_step(&mut self) {}
}

impl Integrator for Gear2 {
    fn allocate(&mut self) -> StateSlot {
        let index = self.slots.len();
        self.slots.push(SlotHistory::default());
        StateSlot(index)
    }

    fn initialize(&mut self, slot: StateSlot, q0: f64) {
        let s = &mut self.slots[slot.0];
        s.q1 = q0;
        s.q2 = q0;
        s.i1 = 0.0;
        s.steps_taken = 0;
    }

    fn integrate(&mut self, slot: StateSlot, q: f64, dq_dx: f64) -> NortonPair {
        let s = &mut self.slots[slot.0];
        let (geq, ieq, i_now) = if s.steps_taken == 0 {
            // Backward Euler: dq/dt(t) ~= (q(t) - q(t-1)) / h.
            let geq = dq_dx / self.h;
            let ieq = s.q1 / self.h;
            let i_now = (q - s.q1) / self.h;
            (geq, ieq, i_now)
        } else {
            // BDF2: dq/dt(t) ~= (1.5 q(t) - 2 q(t-1) + 0.5 q(t-2)) / h.
            let geq = 1.5 * dq_dx / self.h;
            let ieq = (2.0 * s.q1 - 0.5 * s.q2) / self.h;
            let i_now = (1.5 * q - 2.0 * s.q1 + 0.5 * s.q2) / self.h;
            (geq, ieq, i_now)
        };
        s.pending_q = q;
        s.pending_i = i_now;
        let lte_order = if s.steps_taken == 0 { 2.0 } else { 3.0 };
        s.pending_lte = (self.h / lte_order) * (i_now - s.i1).abs();
        NortonPair { geq, ieq }
    }

    fn truncation_error(&self, slot: StateSlot) -> f64 {
        self.slots[slot.0].pending_lte
    }
}

/// Dispatches to whichever concrete integrator
/// [`crate::config::IntegrationMethod`] selected, so the transient driver
/// can hold one object through a whole simulation while still calling the
/// inherent `set_step`/`accept_step`/`reject_step` methods neither the
/// `Integrator` trait nor `volt-devices` need to know about.
pub enum ConcreteIntegrator {
    Trapezoidal(Trapezoidal),
    Gear2(Gear2),
}

impl ConcreteIntegrator {
    #[must_use]
    pub fn new(method: crate::config::IntegrationMethod) -> Self {
        match method {
            crate::config::IntegrationMethod::Trapezoidal => Self::Trapezoidal(Trapezoidal::new()),
            crate::config::IntegrationMethod::Gear2 => Self::Gear2(Gear2::new()),
        }
    }

    pub fn set_step(&mut self, h: f64) {
        match self {
            Self::Trapezoidal(t) => t.set_step(h),
            Self::Gear2(g) => g.set_step(h),
        }
    }

    pub fn accept_step(&mut self) {
        match self {
            Self::Trapezoidal(t) => t.accept_step(),
            Self::Gear2(g) => g.accept_step(),
        }
    }

    pub fn reject_step(&mut self) {
        match self {
            Self::Trapezoidal(t) => t.reject_step(),
            Self::Gear2(g) => g.reject_step(),
        }
    }
}

impl Integrator for ConcreteIntegrator {
    fn allocate(&mut self) -> StateSlot {
        match self {
            Self::Trapezoidal(t) => t.allocate(),
            Self::Gear2(g) => g.allocate(),
        }
    }

    fn initialize(&mut self, slot: StateSlot, q0: f64) {
        match self {
            Self::Trapezoidal(t) => t.initialize(slot, q0),
            Self::Gear2(g) => g.initialize(slot, q0),
        }
    }

    fn integrate(&mut self, slot: StateSlot, q: f64, dq_dx: f64) -> NortonPair {
        match self {
            Self::Trapezoidal(t) => t.integrate(slot, q, dq_dx),
            Self::Gear2(g) => g.integrate(slot, q, dq_dx),
        }
    }

    fn truncation_error(&self, slot: StateSlot) -> f64 {
        match self {
            Self::Trapezoidal(t) => t.truncation_error(slot),
            Self::Gear2(g) => g.truncation_error(slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// P5: a constant current charging a linear capacitor from 0 to T
    /// reaches V(T) = I*T/C within relTol, for both integrators.
    #[test]
    fn trapezoidal_linear_charge_matches_closed_form() {
        let capacitance = 1.0e-6;
        let current = 1.0e-3;
        let total_time = 1.0e-3;
        let steps = 1000;
        let h = total_time / steps as f64;

        let mut integrator = Trapezoidal::new();
        integrator.set_step(h);
        let slot = integrator.allocate();
        integrator.initialize(slot, 0.0);

        let mut v = 0.0;
        for _ in 0..steps {
            // Solve geq*v - ieq = current directly (single unknown, no matrix needed).
            let q = capacitance * v;
            let norton = integrator.integrate(slot, q, capacitance);
            v = (current + norton.ieq) / norton.geq;
            integrator.accept_step();
        }
        let expected = current * total_time / capacitance;
        assert!((v - expected).abs() <= 1e-3 * expected);
    }

    #[test]
    fn gear2_linear_charge_matches_closed_form() {
        let capacitance = 1.0e-6;
        let current = 1.0e-3;
        let total_time = 1.0e-3;
        let steps = 1000;
        let h = total_time / steps as f64;

        let mut integrator = Gear2::new();
        integrator.set_step(h);
        let slot = integrator.allocate();
        integrator.initialize(slot, 0.0);

        let mut v = 0.0;
        for _ in 0..steps {
            let q = capacitance * v;
            let norton = integrator.integrate(slot, q, capacitance);
            v = (current + norton.ieq) / norton.geq;
            integrator.accept_step();
        }
        let expected = current * total_time / capacitance;
        assert!((v - expected).abs() <= 1e-3 * expected);
    }
}
