//! Junction diode: forward exponential, reverse-leakage, and breakdown
//! current regimes with `pnjlim` junction limiting and an optional series
//! resistance allocating an internal anode node `pos'`.

use volt_core::{pnjlim, BaseConfiguration, IterationState, ParameterSet, Variable, VariableKind, VariableSet};
use volt_matrix::{ComplexMatrix, ElementHandle, RealMatrix, RhsHandle};

use crate::behavior::{Behavior, SiblingLookup};
use crate::prelude::*;

pub struct Diode {
    name: String,
    pos: Variable,
    neg: Variable,
    pos_prime: Variable,
    rs: f64,
    is_nominal: f64,
    is: f64,
    n: f64,
    bv: f64,
    ibv: f64,
    /// Saturation-current temperature exponent (SPICE `XTI`).
    xti: f64,
    /// Energy gap, eV, used by the `is` temperature scaling (silicon default).
    eg: f64,
    vt: f64,

    // Series-resistance network (only bound when `rs > 0`).
    r_pp: Option<ElementHandle>,
    r_pint: Option<ElementHandle>,
    r_intp: Option<ElementHandle>,
    r_intint: Option<ElementHandle>,

    // Junction stamp, always against (pos_prime, neg).
    j_pp: Option<ElementHandle>,
    j_pn: Option<ElementHandle>,
    j_np: Option<ElementHandle>,
    j_nn: Option<ElementHandle>,
    rhs_p: Option<RhsHandle>,
    rhs_n: Option<RhsHandle>,

    ac_series: Option<ElementHandle>,
    ac_j_pp: Option<ElementHandle>,
    ac_j_pn: Option<ElementHandle>,
    ac_j_np: Option<ElementHandle>,
    ac_j_nn: Option<ElementHandle>,

    /// Linearized junction conductance from the most recent `load`, reused
    /// as-is by `load_frequency` since the AC driver never re-solves the
    /// nonlinear operating point per frequency.
    gd_at_op: f64,
    /// Set when the last `load` call had `pnjlim` clamp the step; forces the
    /// outer Newton loop to run at least one more iteration.
    force_extra_iteration: bool,
}

impl Diode {
    pub fn new(name: &str, pos: Variable, neg: Variable, params: &ParameterSet) -> Result<Self> {
        let is = params.get_real("is").unwrap_or(1e-14);
        if is <= 0.0 {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "saturation current must be strictly positive".to_string(),
            }
            .into());
        }
        let n = params.get_real("n").unwrap_or(1.0);
        let rs = params.get_real("rs").unwrap_or(0.0);
        if rs < 0.0 {
            return Err(volt_core::Error::BadParameter {
                entity: name.to_string(),
                reason: "series resistance cannot be negative".to_string(),
            }
            .into());
        }
        let bv = params.get_real("bv").unwrap_or(f64::INFINITY);
        let ibv = params.get_real("ibv").unwrap_or(1e-10);
        let xti = params.get_real("xti").unwrap_or(3.0);
        let eg = params.get_real("eg").unwrap_or(1.11);
        Ok(Self {
            name: name.to_string(),
            pos,
            neg,
            pos_prime: pos,
            rs,
            is_nominal: is,
            is,
            n,
            bv,
            ibv,
            xti,
            eg,
            vt: volt_core::constants::thermal_voltage(300.0),
            r_pp: None,
            r_pint: None,
            r_intp: None,
            r_intint: None,
            j_pp: None,
            j_pn: None,
            j_np: None,
            j_nn: None,
            rhs_p: None,
            rhs_n: None,
            ac_series: None,
            ac_j_pp: None,
            ac_j_pn: None,
            ac_j_np: None,
            ac_j_nn: None,
            gd_at_op: 0.0,
            force_extra_iteration: false,
        })
    }

    fn v_crit(&self) -> f64 {
        self.vt * (self.vt / (std::f64::consts::SQRT_2 * self.is)).ln()
    }

    /// Evaluates the junction's (current, conductance) pair at `vd`,
    /// including the always-on `gmin` shunt. Three regimes: forward
    /// exponential, reverse leakage, and post-breakdown exponential; the
    /// breakdown branch is current-continuous with the leakage branch at
    /// `vd = -bv` but not slope-continuous there.
    fn evaluate(&self, vd: f64, gmin: f64) -> (f64, f64) {
        let (id, gd) = if vd >= -self.bv {
            let vte = self.n * self.vt;
            let arg = vd / vte;
            if arg > 80.0 {
                // Guard against overflowing `exp`; the slope stays the
                // conductance at the clamp point, current grows linearly.
                let e = 80.0_f64.exp();
                let gd = self.is / vte * e;
                (self.is * (e - 1.0) + gd * (vd - vte * 80.0), gd)
            } else {
                let e = arg.exp();
                (self.is * (e - 1.0), self.is / vte * e)
            }
        } else {
            let vr = -vd - self.bv;
            let e = (vr / self.vt).exp();
            (-self.is - self.ibv * (e - 1.0), self.ibv / self.vt * e)
        };
        (id, gd + gmin)
    }
}

impl Behavior for Diode {
    fn name(&self) -> &str {
        &self.name
    }

    /// Scales `is` per SPICE's standard diode temperature model --
    /// `is(T) = is(Tnom) * (T/Tnom)^(XTI/N) * exp(Eg*(T/Tnom - 1)/(N*Vt(T)))`
    /// -- and recomputes the thermal voltage at the new operating temperature.
    fn temperature_update(&mut self, config: &BaseConfiguration) -> Result<()> {
        let tnom_k = config.tnom_kelvin();
        let temp_k = config.temp_kelvin();
        self.vt = volt_core::constants::thermal_voltage(temp_k);
        let ratio = temp_k / tnom_k;
        self.is = self.is_nominal * ratio.powf(self.xti / self.n) * ((self.eg / (self.n * self.vt)) * (ratio - 1.0)).exp();
        Ok(())
    }

    fn bind_variables(&mut self, vars: &mut VariableSet) -> Result<()> {
        if self.rs > 0.0 {
            let internal = format!("{}.int", self.name);
            self.pos_prime = vars.create(&internal, VariableKind::Voltage)?;
        }
        Ok(())
    }

    fn bind_matrix(&mut self, matrix: &mut RealMatrix) -> Result<()> {
        if self.rs > 0.0 {
            self.r_pp = Some(matrix.get_element(self.pos.index, self.pos.index));
            self.r_pint = Some(matrix.get_element(self.pos.index, self.pos_prime.index));
            self.r_intp = Some(matrix.get_element(self.pos_prime.index, self.pos.index));
            self.r_intint = Some(matrix.get_element(self.pos_prime.index, self.pos_prime.index));
        }
        self.j_pp = Some(matrix.get_element(self.pos_prime.index, self.pos_prime.index));
        self.j_pn = Some(matrix.get_element(self.pos_prime.index, self.neg.index));
        self.j_np = Some(matrix.get_element(self.neg.index, self.pos_prime.index));
        self.j_nn = Some(matrix.get_element(self.neg.index, self.neg.index));
        self.rhs_p = Some(matrix.get_rhs_element(self.pos_prime.index));
        self.rhs_n = Some(matrix.get_rhs_element(self.neg.index));
        Ok(())
    }

    fn bind_matrix_ac(&mut self, matrix: &mut ComplexMatrix) -> Result<()> {
        if self.rs > 0.0 {
            self.ac_series = Some(matrix.get_element(self.pos.index, self.pos.index));
        }
        self.ac_j_pp = Some(matrix.get_element(self.pos_prime.index, self.pos_prime.index));
        self.ac_j_pn = Some(matrix.get_element(self.pos_prime.index, self.neg.index));
        self.ac_j_np = Some(matrix.get_element(self.neg.index, self.pos_prime.index));
        self.ac_j_nn = Some(matrix.get_element(self.neg.index, self.neg.index));
        Ok(())
    }

    fn load(&mut self, state: &IterationState, matrix: &mut RealMatrix, config: &BaseConfiguration) -> Result<()> {
        if self.rs > 0.0 {
            let g = 1.0 / self.rs;
            matrix.stamp(self.r_pp.expect("bound"), g);
            matrix.stamp(self.r_pint.expect("bound"), -g);
            matrix.stamp(self.r_intp.expect("bound"), -g);
            matrix.stamp(self.r_intint.expect("bound"), g);
        }

        let vd_new = state.value(self.pos_prime) - state.value(self.neg);
        let vd_old = state.previous_value(self.pos_prime) - state.previous_value(self.neg);
        let limited = pnjlim(vd_new, vd_old, self.vt, self.v_crit());
        self.force_extra_iteration = limited.force_extra_iteration;

        let (id, gd) = self.evaluate(limited.vd, config.gmin);
        self.gd_at_op = gd;
        let ieq = gd * limited.vd - id;

        matrix.stamp(self.j_pp.expect("bound"), gd);
        matrix.stamp(self.j_pn.expect("bound"), -gd);
        matrix.stamp(self.j_np.expect("bound"), -gd);
        matrix.stamp(self.j_nn.expect("bound"), gd);
        matrix.stamp_rhs(self.rhs_p.expect("bound"), ieq);
        matrix.stamp_rhs(self.rhs_n.expect("bound"), -ieq);
        Ok(())
    }

    fn load_frequency(&mut self, _omega: f64, matrix: &mut ComplexMatrix) -> Result<()> {
        let gd = faer::c64::new(self.gd_at_op, 0.0);
        if self.rs > 0.0 {
            matrix.stamp(self.ac_series.expect("bound"), faer::c64::new(1.0 / self.rs, 0.0));
        }
        matrix.stamp(self.ac_j_pp.expect("bound"), gd);
        matrix.stamp(self.ac_j_pn.expect("bound"), -gd);
        matrix.stamp(self.ac_j_np.expect("bound"), -gd);
        matrix.stamp(self.ac_j_nn.expect("bound"), gd);
        Ok(())
    }

    fn is_convergent(&self, state: &IterationState, config: &BaseConfiguration) -> bool {
        if self.force_extra_iteration {
            return false;
        }
        let vd_new = state.value(self.pos_prime) - state.value(self.neg);
        let vd_old = state.previous_value(self.pos_prime) - state.previous_value(self.neg);
        let (id_old, gd_old) = self.evaluate(vd_old, config.gmin);
        let (id_new, _) = self.evaluate(vd_new, config.gmin);
        let extrapolated = id_old + gd_old * (vd_new - vd_old);
        let diff = (extrapolated - id_new).abs();
        diff <= config.rel_tol * id_new.abs().max(extrapolated.abs()) + config.abs_tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volt_core::{InitMode, VariableKind};

    fn var(index: usize) -> Variable {
        Variable { index, kind: VariableKind::Voltage }
    }

    fn diode(rs: f64) -> Diode {
        let mut params = ParameterSet::new();
        params.set("is", 1e-14);
        params.set("n", 1.0);
        if rs > 0.0 {
            params.set("rs", rs);
        }
        Diode::new("d1", var(1), var(0), &params).unwrap()
    }

    #[test]
    fn saturation_current_grows_with_operating_temperature() {
        let mut d = diode(0.0);
        let mut cfg = BaseConfiguration::default();
        cfg.temp = cfg.tnom;
        d.temperature_update(&cfg).unwrap();
        let is_at_tnom = d.is;

        cfg.temp = cfg.tnom + 50.0;
        d.temperature_update(&cfg).unwrap();
        assert!(d.is > is_at_tnom, "is should grow with temperature above Tnom");
        assert!(d.vt > volt_core::constants::thermal_voltage(cfg.tnom_kelvin()));
    }

    #[test]
    fn rejects_nonpositive_saturation_current() {
        let mut params = ParameterSet::new();
        params.set("is", 0.0);
        let err = Diode::new("d1", var(1), var(0), &params).unwrap_err();
        assert!(matches!(err, Error::Core(volt_core::Error::BadParameter { .. })));
    }

    #[test]
    fn forward_conductance_is_strictly_positive_and_grows_with_bias() {
        let d = diode(0.0);
        let cfg = BaseConfiguration::default();
        let (_id_low, gd_low) = d.evaluate(0.3, cfg.gmin);
        let (_id_high, gd_high) = d.evaluate(0.6, cfg.gmin);
        assert!(gd_low > 0.0);
        assert!(gd_high > gd_low);
    }

    #[test]
    fn breakdown_current_continues_from_leakage_at_the_seam() {
        let d = diode(0.0);
        let cfg = BaseConfiguration::default();
        let (id_at_bv_from_reverse, _) = d.evaluate(-d.bv + 1e-9, cfg.gmin);
        let (id_at_bv_from_breakdown, _) = d.evaluate(-d.bv - 1e-9, cfg.gmin);
        assert!((id_at_bv_from_reverse - id_at_bv_from_breakdown).abs() < 1e-9);
    }

    #[test]
    fn allocates_internal_node_only_when_series_resistance_is_set() {
        let mut d = diode(0.0);
        let mut vars = VariableSet::new();
        d.bind_variables(&mut vars).unwrap();
        assert_eq!(d.pos_prime, d.pos);

        let mut d2 = diode(10.0);
        d2.bind_variables(&mut vars).unwrap();
        assert_ne!(d2.pos_prime, d2.pos);
    }

    #[test]
    fn five_volt_source_through_1k_clamps_near_the_forward_knee() {
        // 5V - (1k) - D - gnd, solved directly (no voltage-source branch:
        // emulate the 5V/1k Thevenin source as a 5mA Norton current source
        // into the anode with a 1k conductance to ground).
        let mut d = diode(0.0);
        let mut vars = VariableSet::new();
        let anode = vars.create("a", VariableKind::Voltage).unwrap();
        d = Diode::new("d1", anode, vars.ground(), &{
            let mut p = ParameterSet::new();
            p.set("is", 1e-14);
            p.set("n", 1.0);
            p
        }).unwrap();

        let mut matrix = RealMatrix::new(vars.len());
        d.bind_matrix(&mut matrix).unwrap();
        let g_src = matrix.get_element(anode.index, anode.index);
        let rhs_src = matrix.get_rhs_element(anode.index);

        let cfg = BaseConfiguration::default();
        let mut solution = vec![0.0; vars.len()];
        for _ in 0..50 {
            let previous = solution.clone();
            matrix.reset();
            matrix.stamp(g_src, 1.0 / 1000.0);
            matrix.stamp_rhs(rhs_src, 5.0 / 1000.0);
            let state = IterationState::new(InitMode::Float, 0, &solution, &previous);
            d.load(&state, &mut matrix, &cfg).unwrap();
            let factorization = matrix.factor(cfg.pivot_abs_tol).unwrap();
            solution = matrix.solve(&factorization);
        }
        assert!(solution[anode.index] > 0.5 && solution[anode.index] < 0.7);
    }
}
