//! Linear capacitor. Open circuit for OP/DC (no stamps at all beyond the
//! handles `bind_matrix` reserves), a Norton-equivalent companion admittance
//! during transient analysis via the shared [`Integrator`], and a plain
//! admittance `jwC` for AC.

use volt_core::{BaseConfiguration, Integrator, IterationState, ParameterSet, StateSlot, Variable};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix, RhsHandle};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

pub struct Capacitor {
    name: String,
    pos: Variable,
    neg: Variable,
    capacitance: f64,
    slot: Option<StateSlot>,
    pp: Option<ElementHandle>,
    pn: Option<ElementHandle>,
    np: Option<ElementHandle>,
    nn: Option<ElementHandle>,
    rhs_pos: Option<RhsHandle>,
    rhs_neg: Option<RhsHandle>,
    ac_pp: Option<ElementHandle>,
    ac_pn: Option<ElementHandle>,
    ac_np: Option<ElementHandle>,
    ac_nn: Option<ElementHandle>,
}

impl Capacitor {
    pub fn new(name: &str, pos: Variable, neg: Variable, params: &ParameterSet) -> Result<Self> {
        let capacitance = params.get_real("c")?;
        if capacitance <= 0.0 {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "capacitance must be strictly positive".to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            capacitance,
            slot: None,
            pp: None,
            pn: None,
            np: None,
            nn: None,
            rhs_pos: None,
            rhs_neg: None,
            ac_pp: None,
            ac_pn: None,
            ac_np: None,
            ac_nn: None,
        })
    }
}

impl Behavior for Capacitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind_state(&mut self, integrator: &mut dyn Integrator) -> Result<()> {
        self.slot = Some(integrator.allocate());
        Ok(())
    }

    fn initialize_reactive(&mut self, state: &IterationState, integrator: &mut dyn Integrator) {
        if let Some(slot) = self.slot {
            let v = state.value(self.pos) - state.value(self.neg);
            integrator.initialize(slot, self.capacitance * v);
        }
    }

    fn is_reactive(&self) -> bool {
        true
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        self.pp = Some(matrix.get_element(self.pos.index, self.pos.index));
        self.pn = Some(matrix.get_element(self.pos.index, self.neg.index));
        self.np = Some(matrix.get_element(self.neg.index, self.pos.index));
        self.nn = Some(matrix.get_element(self.neg.index, self.neg.index));
        self.rhs_pos = Some(matrix.get_rhs_element(self.pos.index));
        self.rhs_neg = Some(matrix.get_rhs_element(self.neg.index));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        self.ac_pp = Some(matrix.get_element(self.pos.index, self.pos.index));
        self.ac_pn = Some(matrix.get_element(self.pos.index, self.neg.index));
        self.ac_np = Some(matrix.get_element(self.neg.index, self.pos.index));
        self.ac_nn = Some(matrix.get_element(self.neg.index, self.neg.index));
        Ok(())
    }

    fn load_reactive(
        &mut self,
        state: &IterationState,
        matrix: &mut RealMatrix,
        integrator: &mut dyn Integrator,
        _config: &BaseConfiguration,
    ) -> Result<()> {
        let slot = self.slot.expect("bind_state runs before load_reactive");
        let v = state.value(self.pos) - state.value(self.neg);
        let q = self.capacitance * v;
        let norton = integrator.integrate(slot, q, self.capacitance);
        matrix.stamp(self.pp.expect("bound"), norton.geq);
        matrix.stamp(self.pn.expect("bound"), -norton.geq);
        matrix.stamp(self.np.expect("bound"), -norton.geq);
        matrix.stamp(self.nn.expect("bound"), norton.geq);
        matrix.stamp_rhs(self.rhs_pos.expect("bound"), norton.ieq);
        matrix.stamp_rhs(self.rhs_neg.expect("bound"), -norton.ieq);
        Ok(())
    }

    fn load_frequency(&mut self, omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let y = faer::c64::new(0.0, omega * self.capacitance);
        matrix.stamp(self.ac_pp.expect("bound"), y);
        matrix.stamp(self.ac_pn.expect("bound"), -y);
        matrix.stamp(self.ac_np.expect("bound"), -y);
        matrix.stamp(self.ac_nn.expect("bound"), y);
        Ok(())
    }
}
