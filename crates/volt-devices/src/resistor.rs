//! Linear resistor: `g = 1/R` stamped into the four (pos/neg)x(pos/neg)
//! slots, with an optional linear/quadratic temperature coefficient model.

use volt_core::{BaseConfiguration, IterationState, ParameterSet, Variable};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

pub struct Resistor {
    name: String,
    pos: Variable,
    neg: Variable,
    r_nominal: f64,
    tc1: f64,
    tc2: f64,
    r_eff: f64,
    pp: Option<ElementHandle>,
    pn: Option<ElementHandle>,
    np: Option<ElementHandle>,
    nn: Option<ElementHandle>,
    ac_pp: Option<ElementHandle>,
    ac_pn: Option<ElementHandle>,
    ac_np: Option<ElementHandle>,
    ac_nn: Option<ElementHandle>,
}

impl Resistor {
    pub fn new(name: &str, pos: Variable, neg: Variable, params: &ParameterSet) -> Result<Self> {
        let r_nominal = params.get_real("r")?;
        if r_nominal <= 0.0 {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "resistance must be strictly positive".to_string(),
            }
            .into());
        }
        let tc1 = params.get_real("tc1").unwrap_or(0.0);
        let tc2 = params.get_real("tc2").unwrap_or(0.0);
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            r_nominal,
            tc1,
            tc2,
            r_eff: r_nominal,
            pp: None,
            pn: None,
            np: None,
            nn: None,
            ac_pp: None,
            ac_pn: None,
            ac_np: None,
            ac_nn: None,
        })
    }

    fn conductance(&self) -> f64 {
        1.0 / self.r_eff
    }
}

impl Behavior for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature_update(&mut self, config: &BaseConfiguration) -> Result<()> {
        let dtemp = config.temp - config.tnom;
        self.r_eff = self.r_nominal * (1.0 + self.tc1 * dtemp + self.tc2 * dtemp * dtemp);
        Ok(())
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        self.pp = Some(matrix.get_element(self.pos.index, self.pos.index));
        self.pn = Some(matrix.get_element(self.pos.index, self.neg.index));
        self.np = Some(matrix.get_element(self.neg.index, self.pos.index));
        self.nn = Some(matrix.get_element(self.neg.index, self.neg.index));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        self.ac_pp = Some(matrix.get_element(self.pos.index, self.pos.index));
        self.ac_pn = Some(matrix.get_element(self.pos.index, self.neg.index));
        self.ac_np = Some(matrix.get_element(self.neg.index, self.pos.index));
        self.ac_nn = Some(matrix.get_element(self.neg.index, self.neg.index));
        Ok(())
    }

    fn load(&mut self, _state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        let g = self.conductance();
        matrix.stamp(self.pp.expect("bind_matrix runs before load"), g);
        matrix.stamp(self.pn.expect("bind_matrix runs before load"), -g);
        matrix.stamp(self.np.expect("bind_matrix runs before load"), -g);
        matrix.stamp(self.nn.expect("bind_matrix runs before load"), g);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let g = faer::c64::new(self.conductance(), 0.0);
        matrix.stamp(self.ac_pp.expect("bind_matrix_ac runs before load_frequency"), g);
        matrix.stamp(self.ac_pn.expect("bind_matrix_ac runs before load_frequency"), -g);
        matrix.stamp(self.ac_np.expect("bind_matrix_ac runs before load_frequency"), -g);
        matrix.stamp(self.ac_nn.expect("bind_matrix_ac runs before load_frequency"), g);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volt_core::VariableKind;

    fn var(index: usize) -> Variable {
        Variable { index, kind: VariableKind::Voltage }
    }

    #[test]
    fn rejects_nonpositive_resistance() {
        let mut params = ParameterSet::new();
        params.set("r", 0.0);
        let err = Resistor::new("r1", var(1), var(0), &params).unwrap_err();
        assert!(matches!(err, Error::Core(volt_core::Error::BadParameter { .. })));
    }

    #[test]
    fn temperature_coefficients_scale_resistance_away_from_tnom() {
        let mut params = ParameterSet::new();
        params.set("r", 1000.0);
        params.set("tc1", 0.01);
        let mut r = Resistor::new("r1", var(1), var(2), &params).unwrap();

        let mut cfg = BaseConfiguration::default();
        cfg.temp = cfg.tnom;
        r.temperature_update(&cfg).unwrap();
        assert!((r.conductance() - 1.0 / 1000.0).abs() < 1e-12);

        cfg.temp = cfg.tnom + 50.0;
        r.temperature_update(&cfg).unwrap();
        assert!((r.conductance() - 1.0 / 1500.0).abs() < 1e-9);
    }

    #[test]
    fn stamps_reciprocal_conductance_on_all_four_slots() {
        let mut params = ParameterSet::new();
        params.set("r", 1000.0);
        let mut r = Resistor::new("r1", var(1), var(2), &params).unwrap();
        let mut matrix = RealMatrix::new(3);
        r.bind_matrix(&mut matrix).unwrap();
        let solution = vec![0.0; 3];
        let state = IterationState::new(volt_core::InitMode::Float, 0, &solution, &solution);
        r.load(&state, &mut matrix, &BaseConfiguration::default()).unwrap();
        let factorization = matrix.factor(1e-13);
        assert!(factorization.is_err(), "a lone floating resistor leaves both rows singular");
    }
}
