use criterion::{black_box, criterion_group, criterion_main, Criterion};
use volt_core::{Circuit, Entity, ParameterSet};
use volt_solver::cancel::CancellationToken;
use volt_solver::export::VecSink;
use volt_solver::{Simulation, SolverConfig};

fn resistor(name: &str, pos: &str, neg: &str, ohms: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("r", ohms);
    Entity::new(name, "R", vec![pos.to_string(), neg.to_string()], params)
}

fn voltage_source(name: &str, pos: &str, neg: &str, dc: f64) -> Entity {
    let mut params = ParameterSet::new();
    params.set("dc", dc);
    Entity::new(name, "V", vec![pos.to_string(), neg.to_string()], params)
}

/// A ladder of 500 1 kOhm resistors between a 10V source and ground, each
/// rung introducing its own node -- exercises sparse assembly and
/// factorisation at a size representative of a mid-sized flattened netlist.
fn resistor_ladder_500() -> Circuit {
    let mut circuit = Circuit::new();
    circuit.add(voltage_source("v1", "n0", "0", 10.0)).unwrap();
    for i in 0..500 {
        let pos = format!("n{i}");
        let neg = format!("n{}", i + 1);
        circuit.add(resistor(&format!("r{i}"), &pos, &neg, 1000.0)).unwrap();
    }
    circuit.add(resistor("rterm", "n500", "0", 1000.0)).unwrap();
    circuit
}

fn benchmark_resistor_ladder_500(c: &mut Criterion) {
    let circuit = resistor_ladder_500();
    let config = SolverConfig::default();

    c.bench_function("resistor_ladder_500_op", |b| {
        b.iter(|| {
            let cancel = CancellationToken::new();
            let mut sink = VecSink::default();
            Simulation::OperatingPoint.run(&circuit, &config, &cancel, &mut sink).unwrap();
            black_box(sink);
        })
    });
}

criterion_group!(benches, benchmark_resistor_ladder_500);
criterion_main!(benches);
