//! Hysteretic voltage-controlled switch. Conducts at `Ron` once the
//! controlling voltage crosses `Von` going up, at `Roff` once it crosses
//! `Voff` going down, and retains whatever state it last committed while the
//! control voltage sits inside the `[Voff, Von]` band — this is what keeps a
//! control voltage dithering near threshold from chattering the switch every
//! Newton iteration.

use std::cell::Cell;

use volt_core::{BaseConfiguration, IterationState, ParameterSet, Variable};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

pub struct VoltageSwitch {
    name: String,
    pos: Variable,
    neg: Variable,
    cpos: Variable,
    cneg: Variable,
    von: f64,
    voff: f64,
    ron: f64,
    roff: f64,
    /// State committed at the last accepted iteration/time point.
    on: bool,
    /// Trial state computed by the most recent `load`, committed by `accept`.
    pending: Cell<bool>,
    pp: Option<ElementHandle>,
    pn: Option<ElementHandle>,
    np: Option<ElementHandle>,
    nn: Option<ElementHandle>,
    ac_pp: Option<ElementHandle>,
    ac_pn: Option<ElementHandle>,
    ac_np: Option<ElementHandle>,
    ac_nn: Option<ElementHandle>,
}

impl VoltageSwitch {
    pub fn new(
        name: &str,
        pos: Variable,
        neg: Variable,
        cpos: Variable,
        cneg: Variable,
        params: &ParameterSet,
    ) -> Result<Self> {
        let von = params.get_real("von")?;
        let voff = params.get_real("voff")?;
        let ron = params.get_real("ron")?;
        let roff = params.get_real("roff")?;
        if von <= voff {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "von must exceed voff for a well-formed hysteresis band".to_string(),
            }
            .into());
        }
        if ron <= 0.0 || roff <= 0.0 {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "ron and roff must be strictly positive".to_string(),
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            cpos,
            cneg,
            von,
            voff,
            ron,
            roff,
            on: false,
            pending: Cell::new(false),
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

    fn conductance_for(&self, on: bool) -> f64 {
        if on {
            1.0 / self.ron
        } else {
            1.0 / self.roff
        }
    }

    /// Resolves this iteration's trial state from the control voltage and
    /// the last committed state, without mutating anything.
    fn trial_state(&self, vctrl: f64) -> bool {
        if vctrl >= self.von {
            true
        } else if vctrl <= self.voff {
            false
        } else {
            self.on
        }
    }
}

impl Behavior for VoltageSwitch {
    fn name(&self) -> &str {
        &self.name
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

    fn load(&mut self, state: &IterationState, matrix: &mut RealMatrix, _config: &BaseConfiguration) -> Result<()> {
        let vctrl = state.value(self.cpos) - state.value(self.cneg);
        let trial = self.trial_state(vctrl);
        self.pending.set(trial);
        let g = self.conductance_for(trial);
        matrix.stamp(self.pp.expect("bound"), g);
        matrix.stamp(self.pn.expect("bound"), -g);
        matrix.stamp(self.np.expect("bound"), -g);
        matrix.stamp(self.nn.expect("bound"), g);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let g = faer::c64::new(self.conductance_for(self.on), 0.0);
        matrix.stamp(self.ac_pp.expect("bound"), g);
        matrix.stamp(self.ac_pn.expect("bound"), -g);
        matrix.stamp(self.ac_np.expect("bound"), -g);
        matrix.stamp(self.ac_nn.expect("bound"), g);
        Ok(())
    }

    fn accept(&mut self, _state: &IterationState) {
        self.on = self.pending.get();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volt_core::{InitMode, VariableKind};

    fn var(index: usize) -> Variable {
        Variable { index, kind: VariableKind::Voltage }
    }

    fn switch() -> VoltageSwitch {
        let mut params = ParameterSet::new();
        params.set("von", 1.5);
        params.set("voff", 0.5);
        params.set("ron", 1.0);
        params.set("roff", 1.0e6);
        VoltageSwitch::new("s1", var(1), var(0), var(2), var(0), &params).unwrap()
    }

    #[test]
    fn rejects_inverted_hysteresis_band() {
        let mut params = ParameterSet::new();
        params.set("von", 0.5);
        params.set("voff", 1.5);
        params.set("ron", 1.0);
        params.set("roff", 1.0e6);
        let err = VoltageSwitch::new("s1", var(1), var(0), var(2), var(0), &params).unwrap_err();
        assert!(matches!(err, Error::Core(volt_core::Error::BadParameter { .. })));
    }

    #[test]
    fn closes_above_von_and_opens_below_voff_with_no_chatter_inside_band() {
        let mut s = switch();
        assert!(!s.trial_state(0.0));
        assert!(s.trial_state(2.0));
        s.on = true;
        assert!(s.trial_state(2.0));
        s.on = true;
        // Inside the hysteresis band: retains the prior (closed) state.
        assert!(s.trial_state(1.0));
        s.on = false;
        // Same control voltage, but previously open: stays open.
        assert!(!s.trial_state(1.0));
    }

    #[test]
    fn one_full_triangular_sweep_transitions_exactly_once_each_way() {
        let mut s = switch();
        let mut vars = volt_core::VariableSet::new();
        vars.create("out", VariableKind::Voltage).unwrap();
        vars.create("ctrl", VariableKind::Voltage).unwrap();
        let mut matrix = RealMatrix::new(vars.len());
        s.bind_matrix(&mut matrix).unwrap();

        let mut transitions = Vec::new();
        let mut solution = vec![0.0; vars.len()];
        // Rising 0 -> 2V then falling 2 -> 0V over a handful of samples.
        let rising: Vec<f64> = (0..=20).map(|i| i as f64 / 10.0).collect();
        let falling: Vec<f64> = (0..=20).map(|i| 2.0 - i as f64 / 10.0).collect();
        for vctrl in rising.into_iter().chain(falling) {
            solution[var(2).index] = vctrl;
            let state = IterationState::new(InitMode::Float, 0, &solution, &solution);
            let was_on = s.on;
            s.load(&state, &mut matrix, &BaseConfiguration::default()).unwrap();
            s.accept(&state);
            if s.on != was_on {
                transitions.push(s.on);
            }
        }
        assert_eq!(transitions, vec![true, false]);
    }
}
