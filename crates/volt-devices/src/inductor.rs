//! Linear inductor. Introduces a branch-current unknown like a voltage
//! source; OP/DC treats it as a zero-volt short (`V(pos) - V(neg) = 0`),
//! transient analysis replaces that with the flux-linkage companion from the
//! shared [`Integrator`] (`V(pos) - V(neg) - geq*I = -ieq`), and AC stamps
//! the series impedance `jwL` on the branch row.

use volt_core::{BaseConfiguration, Integrator, IterationState, ParameterSet, StateSlot, Variable, VariableKind, VariableSet};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix, RhsHandle};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

pub struct Inductor {
    name: String,
    pos: Variable,
    neg: Variable,
    inductance: f64,
    branch: Option<Variable>,
    slot: Option<StateSlot>,
    e_branch_pos: Option<ElementHandle>,
    e_branch_neg: Option<ElementHandle>,
    e_branch_branch: Option<ElementHandle>,
    e_pos_branch: Option<ElementHandle>,
    e_neg_branch: Option<ElementHandle>,
    rhs_branch: Option<RhsHandle>,
    ac_branch_pos: Option<ElementHandle>,
    ac_branch_neg: Option<ElementHandle>,
    ac_branch_branch: Option<ElementHandle>,
    ac_pos_branch: Option<ElementHandle>,
    ac_neg_branch: Option<ElementHandle>,
}

impl Inductor {
    pub fn new(name: &str, pos: Variable, neg: Variable, params: &ParameterSet) -> Result<Self> {
        let inductance = params.get_real("l")?;
        if inductance <= 0.0 {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "inductance must be strictly positive".to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            inductance,
            branch: None,
            slot: None,
            e_branch_pos: None,
            e_branch_neg: None,
            e_branch_branch: None,
            e_pos_branch: None,
            e_neg_branch: None,
            rhs_branch: None,
            ac_branch_pos: None,
            ac_branch_neg: None,
            ac_branch_branch: None,
            ac_pos_branch: None,
            ac_neg_branch: None,
        })
    }

    fn branch_index(&self) -> usize {
        self.branch.expect("bind_variables runs before bind_matrix").index
    }
}

impl Behavior for Inductor {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_variable(&self) -> Option<Variable> {
        self.branch
    }

    fn bind_variables(&mut self, vars: &mut VariableSet) -> Result<()> {
        let branch_name = format!("branch({})", self.name);
        self.branch = Some(vars.create(&branch_name, VariableKind::Current)?);
        Ok(())
    }

    fn bind_state(&mut self, integrator: &mut dyn Integrator) -> Result<()> {
        self.slot = Some(integrator.allocate());
        Ok(())
    }

    fn initialize_reactive(&mut self, state: &IterationState, integrator: &mut dyn Integrator) {
        if let (Some(slot), Some(branch)) = (self.slot, self.branch) {
            let current = state.value(branch);
            integrator.initialize(slot, self.inductance * current);
        }
    }

    fn is_reactive(&self) -> bool {
        true
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        let branch = self.branch_index();
        self.e_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.e_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.e_branch_branch = Some(matrix.get_element(branch, branch));
        self.e_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.e_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        self.rhs_branch = Some(matrix.get_rhs_element(branch));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        let branch = self.branch_index();
        self.ac_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.ac_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.ac_branch_branch = Some(matrix.get_element(branch, branch));
        self.ac_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.ac_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        Ok(())
    }

    fn load(&mut self, _state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        // Zero-volt short: V(pos) - V(neg) = 0.
        matrix.stamp(self.e_branch_pos.expect("bound"), 1.0);
        matrix.stamp(self.e_branch_neg.expect("bound"), -1.0);
        matrix.stamp(self.e_pos_branch.expect("bound"), 1.0);
        matrix.stamp(self.e_neg_branch.expect("bound"), -1.0);
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
        let branch = self.branch.expect("bind_variables runs before load_reactive");
        let current = state.value(branch);
        let flux = self.inductance * current;
        let norton = integrator.integrate(slot, flux, self.inductance);

        matrix.stamp(self.e_branch_pos.expect("bound"), 1.0);
        matrix.stamp(self.e_branch_neg.expect("bound"), -1.0);
        matrix.stamp(self.e_branch_branch.expect("bound"), -norton.geq);
        matrix.stamp(self.e_pos_branch.expect("bound"), 1.0);
        matrix.stamp(self.e_neg_branch.expect("bound"), -1.0);
        matrix.stamp_rhs(self.rhs_branch.expect("bound"), -norton.ieq);
        Ok(())
    }

    fn load_frequency(&mut self, omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let z = faer::c64::new(0.0, omega * self.inductance);
        matrix.stamp(self.ac_branch_pos.expect("bound"), faer::c64::new(1.0, 0.0));
        matrix.stamp(self.ac_branch_neg.expect("bound"), faer::c64::new(-1.0, 0.0));
        matrix.stamp(self.ac_branch_branch.expect("bound"), -z);
        matrix.stamp(self.ac_pos_branch.expect("bound"), faer::c64::new(1.0, 0.0));
        matrix.stamp(self.ac_neg_branch.expect("bound"), faer::c64::new(-1.0, 0.0));
        Ok(())
    }
}
