//! Independent voltage and current sources. A voltage source introduces a
//! branch-current unknown and stamps a branch equation `V(pos) - V(neg) =
//! value`; a current source needs no extra unknown and only stamps the RHS.

use volt_core::{BaseConfiguration, IterationState, ParameterSet, Variable, VariableKind, VariableSet, Waveform};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix, RhsHandle};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

fn instantaneous(dc_value: f64, waveform: &Option<Waveform>, time: Option<f64>) -> f64 {
    match (time, waveform) {
        (Some(t), Some(w)) => w.value_at(t),
        _ => dc_value,
    }
}

pub struct VoltageSource {
    name: String,
    pos: Variable,
    neg: Variable,
    branch: Option<Variable>,
    dc_value: f64,
    ac_magnitude: f64,
    waveform: Option<Waveform>,
    source_scale: f64,
    e_branch_pos: Option<ElementHandle>,
    e_branch_neg: Option<ElementHandle>,
    e_pos_branch: Option<ElementHandle>,
    e_neg_branch: Option<ElementHandle>,
    rhs_branch: Option<RhsHandle>,
    ac_branch_pos: Option<ElementHandle>,
    ac_branch_neg: Option<ElementHandle>,
    ac_pos_branch: Option<ElementHandle>,
    ac_neg_branch: Option<ElementHandle>,
    ac_rhs_branch: Option<volt_matrix::RhsHandle>,
}

impl VoltageSource {
    pub fn new(name: &str, pos: Variable, neg: Variable, params: &ParameterSet) -> Result<Self> {
        let dc_value = params.get_real("dc").unwrap_or(0.0);
        let ac_magnitude = params.get_real("acmag").unwrap_or(0.0);
        let waveform = params.get_waveform("waveform").ok().cloned();
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            branch: None,
            dc_value,
            ac_magnitude,
            waveform,
            source_scale: 1.0,
            e_branch_pos: None,
            e_branch_neg: None,
            e_pos_branch: None,
            e_neg_branch: None,
            rhs_branch: None,
            ac_branch_pos: None,
            ac_branch_neg: None,
            ac_pos_branch: None,
            ac_neg_branch: None,
            ac_rhs_branch: None,
        })
    }
}

impl Behavior for VoltageSource {
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
        self.e_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.e_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        self.rhs_branch = Some(matrix.get_rhs_element(branch));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        let branch = self.branch.expect("bind_variables runs before bind_matrix_ac").index;
        self.ac_branch_pos = Some(matrix.get_element(branch, self.pos.index));
        self.ac_branch_neg = Some(matrix.get_element(branch, self.neg.index));
        self.ac_pos_branch = Some(matrix.get_element(self.pos.index, branch));
        self.ac_neg_branch = Some(matrix.get_element(self.neg.index, branch));
        self.ac_rhs_branch = Some(matrix.get_rhs_element(branch));
        Ok(())
    }

    fn load(&mut self, state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        matrix.stamp(self.e_branch_pos.expect("bound"), 1.0);
        matrix.stamp(self.e_branch_neg.expect("bound"), -1.0);
        matrix.stamp(self.e_pos_branch.expect("bound"), 1.0);
        matrix.stamp(self.e_neg_branch.expect("bound"), -1.0);
        let value = instantaneous(self.dc_value, &self.waveform, state.time) * self.source_scale;
        matrix.stamp_rhs(self.rhs_branch.expect("bound"), value);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let one = faer::c64::new(1.0, 0.0);
        matrix.stamp(self.ac_branch_pos.expect("bound"), one);
        matrix.stamp(self.ac_branch_neg.expect("bound"), -one);
        matrix.stamp(self.ac_pos_branch.expect("bound"), one);
        matrix.stamp(self.ac_neg_branch.expect("bound"), -one);
        matrix.stamp_rhs(self.ac_rhs_branch.expect("bound"), faer::c64::new(self.ac_magnitude, 0.0));
        Ok(())
    }

    fn set_source_scale(&mut self, scale: f64) {
        self.source_scale = scale;
    }

    fn breakpoints(&self, upto: f64) -> Vec<f64> {
        self.waveform.as_ref().map(|w| w.breakpoints(upto)).unwrap_or_default()
    }
}

pub struct CurrentSource {
    name: String,
    pos: Variable,
    neg: Variable,
    dc_value: f64,
    ac_magnitude: f64,
    waveform: Option<Waveform>,
    source_scale: f64,
    rhs_pos: Option<RhsHandle>,
    rhs_neg: Option<RhsHandle>,
    ac_rhs_pos: Option<RhsHandle>,
    ac_rhs_neg: Option<RhsHandle>,
}

impl CurrentSource {
    pub fn new(name: &str, pos: Variable, neg: Variable, params: &ParameterSet) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            dc_value: params.get_real("dc").unwrap_or(0.0),
            ac_magnitude: params.get_real("acmag").unwrap_or(0.0),
            waveform: params.get_waveform("waveform").ok().cloned(),
            source_scale: 1.0,
            rhs_pos: None,
            rhs_neg: None,
            ac_rhs_pos: None,
            ac_rhs_neg: None,
        })
    }
}

impl Behavior for CurrentSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        self.rhs_pos = Some(matrix.get_rhs_element(self.pos.index));
        self.rhs_neg = Some(matrix.get_rhs_element(self.neg.index));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        self.ac_rhs_pos = Some(matrix.get_rhs_element(self.pos.index));
        self.ac_rhs_neg = Some(matrix.get_rhs_element(self.neg.index));
        Ok(())
    }

    fn load(&mut self, state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        let value = instantaneous(self.dc_value, &self.waveform, state.time) * self.source_scale;
        // Current flows from neg to pos through the source, i.e. out of pos
        // into the external circuit: RHS contribution is -value at pos, +value at neg.
        matrix.stamp_rhs(self.rhs_pos.expect("bound"), -value);
        matrix.stamp_rhs(self.rhs_neg.expect("bound"), value);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let value = faer::c64::new(self.ac_magnitude, 0.0);
        matrix.stamp_rhs(self.ac_rhs_pos.expect("bound"), -value);
        matrix.stamp_rhs(self.ac_rhs_neg.expect("bound"), value);
        Ok(())
    }

    fn set_source_scale(&mut self, scale: f64) {
        self.source_scale = scale;
    }

    fn breakpoints(&self, upto: f64) -> Vec<f64> {
        self.waveform.as_ref().map(|w| w.breakpoints(upto)).unwrap_or_default()
    }
}
