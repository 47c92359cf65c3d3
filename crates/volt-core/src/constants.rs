//! SPICE-compatible numerical defaults, gathered into one
//! immutable configuration struct passed by reference to every behaviour,
//! rather than scattered as module-level constants.

/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.380_649e-23;
/// Elementary charge, C.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Thermal voltage `kT/q` at the given temperature in Kelvin.
#[must_use]
pub fn thermal_voltage(temp_kelvin: f64) -> f64 {
    BOLTZMANN * temp_kelvin / ELEMENTARY_CHARGE
}

/// Global numerical tolerances and iteration limits shared by every driver
/// and behaviour in a simulation. There is no mutable module-level state;
/// a `BaseConfiguration` is constructed once and threaded through by
/// reference for the lifetime of a `Simulation::run` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseConfiguration {
    /// Relative tolerance used by every convergence check.
    pub rel_tol: f64,
    /// Absolute tolerance for branch currents, amperes.
    pub abs_tol: f64,
    /// Absolute tolerance for node voltages, volts.
    pub vntol: f64,
    /// Minimum shunt conductance added to every non-ground node during gmin stepping.
    pub gmin: f64,
    /// Transient truncation-error tolerance factor.
    pub trtol: f64,
    /// Absolute tolerance for integrated charge, coulombs.
    pub chgtol: f64,
    /// Relative pivot tolerance for the sparse factorization.
    pub pivot_rel_tol: f64,
    /// Absolute pivot tolerance for the sparse factorization.
    pub pivot_abs_tol: f64,
    /// Maximum Newton iterations for a DC operating-point solve.
    pub itl1: usize,
    /// Maximum Newton iterations per point in a DC sweep.
    pub itl2: usize,
    /// Maximum Newton iterations per accepted transient step.
    pub itl4: usize,
    /// Number of substeps used by source stepping during OP recovery.
    pub src_steps: usize,
    /// Number of geometric decades used by Gmin stepping during OP recovery.
    pub gmin_steps: usize,
    /// Nominal temperature, degrees Celsius, at which device parameters are specified.
    pub tnom: f64,
    /// Circuit operating temperature, degrees Celsius. Defaults to `tnom`
    /// (no temperature drift); `temperature_update` on every behaviour uses
    /// `temp - tnom` to scale temperature-dependent parameters (resistor
    /// TC1/TC2, diode `is`).
    pub temp: f64,
}

impl Default for BaseConfiguration {
    fn default() -> Self {
        Self {
            rel_tol: 1e-3,
            abs_tol: 1e-12,
            vntol: 1e-6,
            gmin: 1e-12,
            trtol: 7.0,
            chgtol: 1e-14,
            pivot_rel_tol: 1e-3,
            pivot_abs_tol: 1e-13,
            itl1: 100,
            itl2: 50,
            itl4: 10,
            src_steps: 10,
            gmin_steps: 10,
            tnom: 27.0,
            temp: 27.0,
        }
    }
}

impl BaseConfiguration {
    /// Nominal temperature in Kelvin.
    #[must_use]
    pub fn tnom_kelvin(&self) -> f64 {
        self.tnom + 273.15
    }

    /// Operating temperature in Kelvin.
    #[must_use]
    pub fn temp_kelvin(&self) -> f64 {
        self.temp + 273.15
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spice_compatible_values() {
        let cfg = BaseConfiguration::default();
        assert_eq!(cfg.rel_tol, 1e-3);
        assert_eq!(cfg.abs_tol, 1e-12);
        assert_eq!(cfg.vntol, 1e-6);
        assert_eq!(cfg.gmin, 1e-12);
        assert_eq!(cfg.itl1, 100);
        assert_eq!(cfg.itl2, 50);
        assert_eq!(cfg.itl4, 10);
    }

    #[test]
    fn thermal_voltage_at_room_temperature_is_about_26mv() {
        let vt = thermal_voltage(300.0);
        assert!((vt - 0.02585).abs() < 1e-4);
    }

    #[test]
    fn operating_temperature_defaults_to_nominal() {
        let cfg = BaseConfiguration::default();
        assert_eq!(cfg.temp, cfg.tnom);
        assert_eq!(cfg.temp_kelvin(), cfg.tnom_kelvin());
    }
}
