//! Linearly-controlled dependent sources. `Cccs`/`Ccvs` read the
//! controlling voltage source's branch-current variable (resolved through
//! [`SiblingLookup`] at `setup`); `Vccs`/`Vcvs` read the controlling voltage
//! nodes directly and need no sibling resolution. Per `spec.md` §9's open
//! question, all four stamp a fixed linear gain — re-linearising a
//! bias-dependent gain at the operating point is out of scope for this
//! representative set.

use volt_core::{BaseConfiguration, IterationState, ParameterSet, Variable, VariableKind, VariableSet};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

/// Current-controlled current source: `I(pos->neg) = gain * I(control)`.
pub struct Cccs {
    name: String,
    pos: Variable,
    neg: Variable,
    control_name: String,
    control_branch: Option<Variable>,
    gain: f64,
    e_pos_ctrl: Option<ElementHandle>,
    e_neg_ctrl: Option<ElementHandle>,
    ac_pos_ctrl: Option<ElementHandle>,
    ac_neg_ctrl: Option<ElementHandle>,
}

impl Cccs {
    pub fn new(name: &str, pos: Variable, neg: Variable, control_name: &str, params: &ParameterSet) -> Result<Self> {
        let gain = params.get_real("gain")?;
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            control_name: control_name.to_string(),
            control_branch: None,
            gain,
            e_pos_ctrl: None,
            e_neg_ctrl: None,
            ac_pos_ctrl: None,
            ac_neg_ctrl: None,
        })
    }
}

impl Behavior for Cccs {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, siblings: &dyn SiblingLookup) -> Result<()> {
        self.control_branch = Some(
            siblings
                .branch_variable(&self.control_name)
                .ok_or_else(|| volt_core::Error::UnknownEntity(self.control_name.clone()))?,
        );
        Ok(())
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        let ctrl = self.control_branch.expect("setup runs before bind_matrix").index;
        self.e_pos_ctrl = Some(matrix.get_element(self.pos.index, ctrl));
        self.e_neg_ctrl = Some(matrix.get_element(self.neg.index, ctrl));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        let ctrl = self.control_branch.expect("setup runs before bind_matrix_ac").index;
        self.ac_pos_ctrl = Some(matrix.get_element(self.pos.index, ctrl));
        self.ac_neg_ctrl = Some(matrix.get_element(self.neg.index, ctrl));
        Ok(())
    }

    fn load(&mut self, _state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        matrix.stamp(self.e_pos_ctrl.expect("bound"), self.gain);
        matrix.stamp(self.e_neg_ctrl.expect("bound"), -self.gain);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let gain = faer::c64::new(self.gain, 0.0);
        matrix.stamp(self.ac_pos_ctrl.expect("bound"), gain);
        matrix.stamp(self.ac_neg_ctrl.expect("bound"), -gain);
        Ok(())
    }
}

/// Current-controlled voltage source: `V(pos)-V(neg) = gain * I(control)`.
/// Introduces its own branch-current unknown, like an independent voltage
/// source, with the branch equation's RHS replaced by the scaled control
/// current instead of a fixed value.
pub struct Ccvs {
    name: String,
    pos: Variable,
    neg: Variable,
    control_name: String,
    control_branch: Option<Variable>,
    branch: Option<Variable>,
    gain: f64,
    e_branch_pos: Option<ElementHandle>,
    e_branch_neg: Option<ElementHandle>,
    e_branch_ctrl: Option<ElementHandle>,
    e_pos_branch: Option<ElementHandle>,
    e_neg_branch: Option<ElementHandle>,
    ac_branch_pos: Option<ElementHandle>,
    ac_branch_neg: Option<ElementHandle>,
    ac_branch_ctrl: Option<ElementHandle>,
    ac_pos_branch: Option<ElementHandle>,
    ac_neg_branch: Option<ElementHandle>,
}

impl Ccvs {
    pub fn new(name: &str, pos: Variable, neg: Variable, control_name: &str, params: &ParameterSet) -> Result<Self> {
        let gain = params.get_real("gain")?;
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            control_name: control_name.to_string(),
            control_branch: None,
            branch: None,
            gain,
            e_branch_pos: None,
            e_branch_neg: None,
            e_branch_ctrl: None,
            e_pos_branch: None,
            e_neg_branch: None,
            ac_branch_pos: None,
            ac_branch_neg: None,
            ac_branch_ctrl: None,
            ac_pos_branch: None,
            ac_neg_branch: None,
        })
    }
}

impl Behavior for Ccvs {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_variable(&self) -> Option<Variable> {
        self.branch
    }

    fn setup(&mut self, siblings: &dyn SiblingLookup) -> Result<()> {
        self.control_branch = Some(
            siblings
                .branch_variable(&self.control_name)
                .ok_or_else(|| volt_core::Error::UnknownEntity(self.control_name.clone()))?,
        );
        Ok(())
    }

    fn bind_variables(&mut self, vars: &mut VariableSet) -> Result<()> {
        let branch_name = format!("branch({})", self.name);
        self.branch = Some(vars.create(&branch_name, VariableKind::Current)?);
        Ok(())
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        let branch = self.branch.expect("bind_variables runs before bind_matrix").index;
        let ctrl = self.control_branch.expect("setup runs before bind_matrix").index;
        self.e_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.e_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.e_branch_ctrl = Some(matrix.get_element(branch, ctrl));
        self.e_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.e_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        let branch = self.branch.expect("bind_variables runs before bind_matrix_ac").index;
        let ctrl = self.control_branch.expect("setup runs before bind_matrix_ac").index;
        self.ac_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.ac_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.ac_branch_ctrl = Some(matrix.get_element(branch, ctrl));
        self.ac_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.ac_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        Ok(())
    }

    fn load(&mut self, _state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        matrix.stamp(self.e_branch_pos.expect("bound"), 1.0);
        matrix.stamp(self.e_branch_neg.expect("bound"), -1.0);
        matrix.stamp(self.e_branch_ctrl.expect("bound"), -self.gain);
        matrix.stamp(self.e_pos_branch.expect("bound"), 1.0);
        matrix.stamp(self.e_neg_branch.expect("bound"), -1.0);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let one = faer::c64::new(1.0, 0.0);
        matrix.stamp(self.ac_branch_pos.expect("bound"), one);
        matrix.stamp(self.ac_branch_neg.expect("bound"), -one);
        matrix.stamp(self.ac_branch_ctrl.expect("bound"), faer::c64::new(-self.gain, 0.0));
        matrix.stamp(self.ac_pos_branch.expect("bound"), one);
        matrix.stamp(self.ac_neg_branch.expect("bound"), -one);
        Ok(())
    }
}

/// Voltage-controlled current source: `I(pos->neg) = gain * (V(cpos)-V(cneg))`.
pub struct Vccs {
    name: String,
    pos: Variable,
    neg: Variable,
    cpos: Variable,
    cneg: Variable,
    gain: f64,
    e_pos_cpos: Option<ElementHandle>,
    e_pos_cneg: Option<ElementHandle>,
    e_neg_cpos: Option<ElementHandle>,
    e_neg_cneg: Option<ElementHandle>,
    ac_pos_cpos: Option<ElementHandle>,
    ac_pos_cneg: Option<ElementHandle>,
    ac_neg_cpos: Option<ElementHandle>,
    ac_neg_cneg: Option<ElementHandle>,
}

impl Vccs {
    pub fn new(name: &str, pos: Variable, neg: Variable, cpos: Variable, cneg: Variable, params: &ParameterSet) -> Result<Self> {
        let gain = params.get_real("gain")?;
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            cpos,
            cneg,
            gain,
            e_pos_cpos: None,
            e_pos_cneg: None,
            e_neg_cpos: None,
            e_neg_cneg: None,
            ac_pos_cpos: None,
            ac_pos_cneg: None,
            ac_neg_cpos: None,
            ac_neg_cneg: None,
        })
    }
}

impl Behavior for Vccs {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        self.e_pos_cpos = Some(matrix.get_element(self.pos.index, self.cpos.index));
        self.e_pos_cneg = Some(matrix.get_element(self.pos.index, self.cneg.index));
        self.e_neg_cpos = Some(matrix.get_element(self.neg.index, self.cpos.index));
        self.e_neg_cneg = Some(matrix.get_element(self.neg.index, self.cneg.index));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        self.ac_pos_cpos = Some(matrix.get_element(self.pos.index, self.cpos.index));
        self.ac_pos_cneg = Some(matrix.get_element(self.pos.index, self.cneg.index));
        self.ac_neg_cpos = Some(matrix.get_element(self.neg.index, self.cpos.index));
        self.ac_neg_cneg = Some(matrix.get_element(self.neg.index, self.cneg.index));
        Ok(())
    }

    fn load(&mut self, _state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        matrix.stamp(self.e_pos_cpos.expect("bound"), self.gain);
        matrix.stamp(self.e_pos_cneg.expect("bound"), -self.gain);
        matrix.stamp(self.e_neg_cpos.expect("bound"), -self.gain);
        matrix.stamp(self.e_neg_cneg.expect("bound"), self.gain);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let gain = faer::c64::new(self.gain, 0.0);
        matrix.stamp(self.ac_pos_cpos.expect("bound"), gain);
        matrix.stamp(self.ac_pos_cneg.expect("bound"), -gain);
        matrix.stamp(self.ac_neg_cpos.expect("bound"), -gain);
        matrix.stamp(self.ac_neg_cneg.expect("bound"), gain);
        Ok(())
    }
}

/// Voltage-controlled voltage source: `V(pos)-V(neg) = gain * (V(cpos)-V(cneg))`.
pub struct Vcvs {
    name: String,
    pos: Variable,
    neg: Variable,
    cpos: Variable,
    cneg: Variable,
    branch: Option<Variable>,
    gain: f64,
    e_branch_pos: Option<ElementHandle>,
    e_branch_neg: Option<ElementHandle>,
    e_branch_cpos: Option<ElementHandle>,
    e_branch_cneg: Option<ElementHandle>,
    e_pos_branch: Option<ElementHandle>,
    e_neg_branch: Option<ElementHandle>,
    ac_branch_pos: Option<ElementHandle>,
    ac_branch_neg: Option<ElementHandle>,
    ac_branch_cpos: Option<ElementHandle>,
    ac_branch_cneg: Option<ElementHandle>,
    ac_pos_branch: Option<ElementHandle>,
    ac_neg_branch: Option<ElementHandle>,
}

impl Vcvs {
    pub fn new(name: &str, pos: Variable, neg: Variable, cpos: Variable, cneg: Variable, params: &ParameterSet) -> Result<Self> {
        let gain = params.get_real("gain")?;
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            cpos,
            cneg,
            branch: None,
            gain,
            e_branch_pos: None,
            e_branch_neg: None,
            e_branch_cpos: None,
            e_branch_cneg: None,
            e_pos_branch: None,
            e_neg_branch: None,
            ac_branch_pos: None,
            ac_branch_neg: None,
            ac_branch_cpos: None,
            ac_branch_cneg: None,
            ac_pos_branch: None,
            ac_neg_branch: None,
        })
    }
}

impl Behavior for Vcvs {
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

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        let branch = self.branch.expect("bind_variables runs before bind_matrix").index;
        self.e_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.e_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.e_branch_cpos = Some(matrix.get_element(branch, self.cpos.index));
        self.e_branch_cneg = Some(matrix.get_element(branch, self.cneg.index));
        self.e_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.e_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        let branch = self.branch.expect("bind_variables runs before bind_matrix_ac").index;
        self.ac_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.ac_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.ac_branch_cpos = Some(matrix.get_element(branch, self.cpos.index));
        self.ac_branch_cneg = Some(matrix.get_element(branch, self.cneg.index));
        self.ac_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.ac_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        Ok(())
    }

    fn load(&mut self, _state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        matrix.stamp(self.e_branch_pos.expect("bound"), 1.0);
        matrix.stamp(self.e_branch_neg.expect("bound"), -1.0);
        matrix.stamp(self.e_branch_cpos.expect("bound"), -self.gain);
        matrix.stamp(self.e_branch_cneg.expect("bound"), self.gain);
        matrix.stamp(self.e_pos_branch.expect("bound"), 1.0);
        matrix.stamp(self.e_neg_branch.expect("bound"), -1.0);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let one = faer::c64::new(1.0, 0.0);
        let gain = faer::c64::new(self.gain, 0.0);
        matrix.stamp(self.ac_branch_pos.expect("bound"), one);
        matrix.stamp(self.ac_branch_neg.expect("bound"), -one);
        matrix.stamp(self.ac_branch_cpos.expect("bound"), -gain);
        matrix.stamp(self.ac_branch_cneg.expect("bound"), gain);
        matrix.stamp(self.ac_pos_branch.expect("bound"), one);
        matrix.stamp(self.ac_neg_branch.expect("bound"), -one);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volt_core::{InitMode, VariableKind};

    fn var(index: usize) -> Variable {
        Variable { index, kind: VariableKind::Voltage }
    }

    struct FixedSibling(Variable);
    impl SiblingLookup for FixedSibling {
        fn branch_variable(&self, _entity_name: &str) -> Option<Variable> {
            Some(self.0)
        }
    }

    /// Scenario 5: V1=1V driving a 1 ohm return path; F1 (CCCS, gain 3,
    /// controlled by V1) into 2 ohms to ground. Expect `|I(F1)| = 3A`,
    /// `V(F1 node) = 6V`.
    #[test]
    fn cccs_gain_scenario_matches_expected_node_voltage() {
        let mut vars = VariableSet::new();
        let v1_pos = vars.create("in", VariableKind::Voltage).unwrap();
        let out = vars.create("out", VariableKind::Voltage).unwrap();
        let v1_branch = vars.create("branch(v1)", VariableKind::Current).unwrap();

        let mut params = ParameterSet::new();
        params.set("gain", 3.0);
        let mut f1 = Cccs::new("f1", out, vars.ground(), "v1", &params).unwrap();
        f1.setup(&FixedSibling(v1_branch)).unwrap();

        let mut matrix = RealMatrix::new(vars.len());
        // V1's branch equation: V(in) - V(gnd) = 1.0.
        let e_branch_in = matrix.get_element(v1_branch.index, v1_pos.index);
        let rhs_branch = matrix.get_rhs_element(v1_branch.index);
        // The nodal contribution of V1's own branch current at "in".
        let e_in_branch = matrix.get_element(v1_pos.index, v1_branch.index);
        // The 1 ohm return path V1 "drives": the only other connection at
        // "in", so it carries exactly V1's branch current.
        let r_in = matrix.get_element(v1_pos.index, v1_pos.index);
        let r_out = matrix.get_element(out.index, out.index);
        f1.bind_matrix(&mut matrix).unwrap();

        matrix.stamp(e_branch_in, 1.0);
        matrix.stamp_rhs(rhs_branch, 1.0);
        matrix.stamp(e_in_branch, 1.0);
        matrix.stamp(r_in, 1.0);
        matrix.stamp(r_out, 1.0 / 2.0);

        let solution = vec![0.0; vars.len()];
        let state = IterationState::new(InitMode::Float, 0, &solution, &solution);
        f1.load(&state, &mut matrix, &BaseConfiguration::default()).unwrap();

        let factorization = matrix.factor(1e-13).unwrap();
        let x = matrix.solve(&factorization);
        assert!((x[v1_pos.index] - 1.0).abs() < 1e-9);
        assert!((x[v1_branch.index].abs() - 1.0).abs() < 1e-9);
        assert!((x[out.index] - 6.0).abs() < 1e-6);
    }
}
