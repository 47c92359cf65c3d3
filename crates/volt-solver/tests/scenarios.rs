//! Integration coverage for the six worked scenarios: a resistor divider,
//! a diode clamp, an RC transient step response, an AC RLC sweep, a CCCS
//! gain stage, and a hysteretic switch driven by a triangular control
//! waveform.

use std::f64::consts::TAU;

use volt_core::{Circuit, Entity, ParameterSet, Pulse, Pwl, VariableSet, Waveform};
use volt_devices::Behavior;
use volt_matrix::RealMatrix;
use volt_solver::ac::{AcSweep, SweepType};
use volt_solver::cancel::CancellationToken;
use volt_solver::export::{PhasorVecSink, VecSink};
use volt_solver::transient::TransientAnalysis;
use volt_solver::{Simulation, SolverConfig};

fn resistor(name: &str, pos: &str, neg: &str, ohms: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("r", ohms);
    Entity::new(name, "R", vec![pos.to_string(), neg.to_string()], params)
}

fn capacitor(name: &str, pos: &str, neg: &str, farads: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("c", farads);
    Entity::new(name, "C", vec![pos.to_string(), neg.to_string()], params)
}

fn inductor(name: &str, pos: &str, neg: &str, henries: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("l", henries);
    Entity::new(name, "L", vec![pos.to_string(), neg.to_string()], params)
}

fn voltage_source(name: &str, pos: &str, neg: &str, dc: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("dc", dc);
    Entity::new(name, "V", vec![pos.to_string(), neg.to_string()], params)
}

fn step_voltage_source(name: &str, pos: &str, neg: &str, from: f64, to: f64, at: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("dc", from);
    params.set(
        "waveform",
        Waveform::Pulse(Pulse {
            initial_value: from,
            pulsed_value: to,
            delay_time: at,
            rise_time: 1e-9,
            fall_time: 1e-9,
            pulse_width: 1.0,
            period: 0.0,
        }),
    );
    Entity::new(name, "V", vec![pos.to_string(), neg.to_string()], params)
}

fn ac_voltage_source(name: &str, pos: &str, neg: &str, acmag: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("dc", 0.0);
    params.set("acmag", acmag);
    Entity::new(name, "V", vec![pos.to_string(), neg.to_string()], params)
}

fn diode(name: &str, pos: &str, neg: &str) -> Entity {
    let mut params = ParameterSet::new();
    params.set("is", 1e-14);
    params.set("n", 1.0);
    Entity::new(name, "D", vec![pos.to_string(), neg.to_string()], params)
}

/// Scenario 1: two 1 kOhm resistors between a 10V DC source and ground via
/// node `mid`. Expect V(mid) = 5.0V, at-machine-precision (P3 Ohm's law).
#[test]
fn scenario_1_resistor_divider() {
    let mut circuit = Circuit::new();
    circuit.add(voltage_source("v1", "in", "0", 10.0)).unwrap();
    circuit.add(resistor("r1", "in", "mid", 1000.0)).unwrap();
    circuit.add(resistor("r2", "mid", "0", 1000.0)).unwrap();

    let config = SolverConfig::default();
    let cancel = CancellationToken::new();
    let mut sink = VecSink::default();
    Simulation::OperatingPoint.run(&circuit, &config, &cancel, &mut sink).unwrap();

    let point = &sink.points[0];
    assert!((point.values["mid"] - 5.0).abs() < 1e-9);
}

/// Scenario 2: 5V through 1 kOhm into a diode (Is=1e-14, N=1) to ground.
/// Expect V(D) in [0.55, 0.65]V, I ~= (5-V)/1000, Newton converges in <= 8
/// iterations from a cold (all-zero) start.
#[test]
fn scenario_2_diode_clamp_converges_quickly_near_the_forward_knee() {
    let mut circuit = Circuit::new();
    circuit.add(voltage_source("v1", "in", "0", 5.0)).unwrap();
    circuit.add(resistor("r1", "in", "d", 1000.0)).unwrap();
    circuit.add(diode("d1", "d", "0")).unwrap();

    let mut vars = VariableSet::new();
    let mut behaviors = volt_solver::bind::bind(&circuit, &mut vars).unwrap();
    let config = SolverConfig::default();
    for behavior in &mut behaviors {
        behavior.temperature_update(&config.base).unwrap();
    }
    let mut matrix = RealMatrix::new(vars.len());
    for behavior in &mut behaviors {
        behavior.bind_matrix(&mut matrix).unwrap();
    }

    let cancel = CancellationToken::new();
    let zeros = vec![0.0; vars.len()];
    let (solution, iterations) =
        volt_solver::newton::newton_iterate(&mut behaviors, &mut matrix, &vars, &config.base, config.base.itl1, zeros, 0.0, &cancel).unwrap();

    let vd = solution[vars.map("d").unwrap().index];
    assert!(vd > 0.55 && vd < 0.65, "V(D) = {vd} out of expected forward-knee range");
    let current = (5.0 - vd) / 1000.0;
    assert!(current > 0.0);
    assert!(iterations <= 8, "expected convergence within 8 iterations, took {iterations}");
}

/// Scenario 3: R=1k, C=1uF, a 0->1V step at t=0 into the RC node. The
/// operating point at t=0 sees the source's "dc" value (0V, the
/// pre-step level), so the capacitor starts uncharged and the transient
/// waveform steps the source to 1V at t=0. Expect V(t) = 1 - exp(-t/tau)
/// within 0.5% at every accepted step (P5).
#[test]
fn scenario_3_rc_step_response_matches_closed_form_at_every_accepted_step() {
    let mut circuit = Circuit::new();
    circuit.add(step_voltage_source("v1", "in", "0", 0.0, 1.0, 0.0)).unwrap();
    circuit.add(resistor("r1", "in", "out", 1000.0)).unwrap();
    circuit.add(capacitor("c1", "out", "0", 1.0e-6)).unwrap();

    let config = SolverConfig::default();
    let analysis = TransientAnalysis {
        step: 1e-6,
        stop: 5e-3,
        start: 0.0,
        max_step: 50e-6,
    };
    let cancel = CancellationToken::new();
    let mut sink = VecSink::default();
    Simulation::Transient(analysis).run(&circuit, &config, &cancel, &mut sink).unwrap();

    let tau = 1000.0 * 1.0e-6;
    for point in &sink.points {
        let Some(t) = point.time else { continue };
        if t <= 0.0 {
            continue;
        }
        let expected = 1.0 - (-t / tau).exp();
        let got = point.values["out"];
        // Near t=0 the step transient relative error is dominated by the
        // absolute floor rather than the 0.5% relative band.
        let tolerance = (0.005 * expected.abs()).max(2e-3);
        assert!((got - expected).abs() <= tolerance, "at t={t}: got {got}, expected {expected}");
    }
}

/// Scenario 4: series R=10, L=1mH, C=100nF across a 1V AC source, swept
/// 100Hz to 100kHz decade/20. Expect the admittance magnitude (and hence
/// |I(V1)|) to peak within one grid point of f0 = 1/(2*pi*sqrt(LC)), and
/// the peak magnitude to match Q = (1/R)*sqrt(L/C) times the 1V drive (P6
/// boundary: a linear circuit's AC response is exactly its Jacobian).
#[test]
fn scenario_4_series_rlc_ac_sweep_peaks_at_resonance() {
    let mut circuit = Circuit::new();
    circuit.add(ac_voltage_source("v1", "in", "a", 1.0)).unwrap();
    circuit.add(resistor("r1", "a", "b", 10.0)).unwrap();
    circuit.add(inductor("l1", "b", "c", 1.0e-3)).unwrap();
    circuit.add(capacitor("c1", "c", "0", 100.0e-9)).unwrap();

    let config = SolverConfig::default();
    let sweep = AcSweep {
        sweep: SweepType::Decade,
        points: 20,
        fstart: 100.0,
        fstop: 100_000.0,
    };
    let cancel = CancellationToken::new();
    let mut sink = PhasorVecSink::default();
    Simulation::Ac(sweep.clone()).run_ac(&circuit, &config, &cancel, &mut sink).unwrap();

    let f0 = 1.0 / (TAU * (1.0e-3 * 100.0e-9_f64).sqrt());
    let frequencies = sweep.frequencies();
    // ~20 points/decade -> consecutive grid points differ by roughly 10^(1/20).
    let grid_ratio = 10.0_f64.powf(1.0 / 20.0);

    let (peak_index, peak_point) = sink
        .points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.values["branch(v1)"].norm().partial_cmp(&b.values["branch(v1)"].norm()).unwrap()
        })
        .unwrap();

    let peak_freq = frequencies[peak_index];
    assert!(
        (peak_freq / f0).max(f0 / peak_freq) <= grid_ratio * 1.1,
        "resonance at {peak_freq}Hz not within one grid point of f0={f0}Hz"
    );

    // At resonance the series reactance cancels and Z=R, so I = V/R.
    let expected_peak_current = 1.0 / 10.0;
    let got_peak_current = peak_point.values["branch(v1)"].norm();
    assert!(
        (got_peak_current - expected_peak_current).abs() <= 0.1 * expected_peak_current,
        "peak current {got_peak_current} does not match V/R={expected_peak_current}"
    );
}

/// Scenario 5: V1=1V drives 1 Ohm; CCCS F1 (controlled by V1, gain 3) feeds
/// 2 Ohm to ground. Expect I(F1) = 3A, V(F1 node) = 6V.
#[test]
fn scenario_5_cccs_gain_matches_expected_node_voltage() {
    let mut circuit = Circuit::new();
    circuit.add(voltage_source("v1", "in", "0", 1.0)).unwrap();
    circuit.add(resistor("r1", "in", "0", 1.0)).unwrap();
    let mut params = ParameterSet::new();
    params.set("gain", 3.0);
    params.set("control", "v1");
    circuit
        .add(Entity::new("f1", "F", vec!["out".to_string(), "0".to_string()], params))
        .unwrap();
    circuit.add(resistor("r2", "out", "0", 2.0)).unwrap();

    let config = SolverConfig::default();
    let cancel = CancellationToken::new();
    let mut sink = VecSink::default();
    Simulation::OperatingPoint.run(&circuit, &config, &cancel, &mut sink).unwrap();

    let point = &sink.points[0];
    assert!((point.values["out"] - 6.0).abs() < 1e-6);
}

/// Scenario 6: Vcont triangular 0->2->0V over 2ms, switch Von=1.5V,
/// Voff=0.5V, Ron=1, Roff=1MEG. With a stiff 5V source through a large
/// series resistor feeding the switch, expect exactly one high-to-low
/// transition (switch closes) around the Von crossing at t=0.75ms and one
/// low-to-high transition (switch opens) around the Voff crossing at
/// t=1.75ms, with no chatter in between.
#[test]
fn scenario_6_switch_hysteresis_has_no_chatter() {
    let mut circuit = Circuit::new();
    circuit.add(voltage_source("vdrive", "in", "0", 5.0)).unwrap();
    circuit.add(resistor("r1", "in", "out", 10_000.0)).unwrap();

    let mut ctrl_params = ParameterSet::new();
    ctrl_params.set("dc", 0.0);
    ctrl_params.set(
        "waveform",
        Waveform::Pwl(Pwl {
            points: vec![(0.0, 0.0), (1.0e-3, 2.0), (2.0e-3, 0.0)],
        }),
    );
    circuit
        .add(Entity::new("vcont", "V", vec!["ctrl".to_string(), "0".to_string()], ctrl_params))
        .unwrap();

    let mut switch_params = ParameterSet::new();
    switch_params.set("von", 1.5);
    switch_params.set("voff", 0.5);
    switch_params.set("ron", 1.0);
    switch_params.set("roff", 1.0e6);
    circuit
        .add(Entity::new(
            "s1",
            "S",
            vec!["out".to_string(), "0".to_string(), "ctrl".to_string(), "0".to_string()],
            switch_params,
        ))
        .unwrap();

    let config = SolverConfig::default();
    let analysis = TransientAnalysis {
        step: 5e-6,
        stop: 2.0e-3,
        start: 0.0,
        max_step: 5e-6,
    };
    let cancel = CancellationToken::new();
    let mut sink = VecSink::default();
    Simulation::Transient(analysis).run(&circuit, &config, &cancel, &mut sink).unwrap();

    // Above ~2.5V the switch is open (out close to the 5V rail); below it
    // the switch is closed and out is pulled close to ground.
    let mut transitions = Vec::new();
    let mut was_closed = false;
    for point in &sink.points {
        let out = point.values["out"];
        let closed = out < 2.5;
        if closed != was_closed {
            transitions.push((point.time.unwrap(), closed));
        }
        was_closed = closed;
    }

    assert_eq!(transitions.len(), 2, "expected exactly one close and one open transition, got {transitions:?}");
    assert!(transitions[0].1, "first transition should be a close (switch turning on)");
    assert!((transitions[0].0 - 0.75e-3).abs() < 0.1e-3);
    assert!(!transitions[1].1, "second transition should be an open (switch turning off)");
    assert!((transitions[1].0 - 1.75e-3).abs() < 0.1e-3);
}
