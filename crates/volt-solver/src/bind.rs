//! Turns a bare `Circuit` (just entities and their parameters) into the
//! bound device list a driver stamps every iteration: pins resolved to
//! `Variable`s, internal/branch variables allocated, and controlled-source
//! sibling references resolved in one pass (no topological sort needed since
//! every behaviour's `setup` only looks up a *branch* variable, which
//! `bind_variables` has already allocated for every device by the time
//! `setup` runs).

use std::collections::HashMap;

use volt_core::{Circuit, Variable, VariableKind, VariableSet};
use volt_devices::prelude::*;
use volt_devices::{Behavior, Capacitor, Cccs, Ccvs, Diode, Inductor, Resistor, SiblingLookup, Vccs, Vcvs, VoltageSwitch};
use volt_devices::{CurrentSource, VoltageSource};

use crate::prelude::*;

struct BranchRegistry {
    by_name: HashMap<String, Variable>,
}

impl SiblingLookup for BranchRegistry {
    fn branch_variable(&self, entity_name: &str) -> Option<Variable> {
        self.by_name.get(entity_name).copied()
    }
}

fn pin(vars: &mut VariableSet, name: &str) -> Result<Variable> {
    Ok(vars.create(name, VariableKind::Voltage)?)
}

/// Constructs one behaviour per entity, dispatching on its device-kind tag.
/// SPICE-style single-letter prefixes: R, C, L, V, I, D, F (CCCS), H (CCVS),
/// G (VCCS), E (VCVS), S (switch).
fn construct(circuit: &Circuit, vars: &mut VariableSet) -> Result<Vec<Box<dyn Behavior>>> {
    let mut behaviors: Vec<Box<dyn Behavior>> = Vec::with_capacity(circuit.entities().len());
    for entity in circuit.entities() {
        let pins = entity.pins();
        let params = entity.parameters();
        let behavior: Box<dyn Behavior> = match entity.kind() {
            "R" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                Box::new(Resistor::new(entity.name(), p, n, params)?)
            }
            "C" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                Box::new(Capacitor::new(entity.name(), p, n, params)?)
            }
            "L" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                Box::new(Inductor::new(entity.name(), p, n, params)?)
            }
            "V" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                Box::new(VoltageSource::new(entity.name(), p, n, params)?)
            }
            "I" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                Box::new(CurrentSource::new(entity.name(), p, n, params)?)
            }
            "D" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                Box::new(Diode::new(entity.name(), p, n, params)?)
            }
            "F" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                let control = params.get_string("control")?.to_string();
                Box::new(Cccs::new(entity.name(), p, n, &control, params)?)
            }
            "H" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                let control = params.get_string("control")?.to_string();
                Box::new(Ccvs::new(entity.name(), p, n, &control, params)?)
            }
            "G" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                let cp = pin(vars, &pins[2])?;
                let cn = pin(vars, &pins[3])?;
                Box::new(Vccs::new(entity.name(), p, n, cp, cn, params)?)
            }
            "E" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                let cp = pin(vars, &pins[2])?;
                let cn = pin(vars, &pins[3])?;
                Box::new(Vcvs::new(entity.name(), p, n, cp, cn, params)?)
            }
            "S" => {
                let p = pin(vars, &pins[0])?;
                let n = pin(vars, &pins[1])?;
                let cp = pin(vars, &pins[2])?;
                let cn = pin(vars, &pins[3])?;
                Box::new(VoltageSwitch::new(entity.name(), p, n, cp, cn, params)?)
            }
            other => return Err(volt_core::Error::UnknownEntity(other.to_string()).into()),
        };
        behaviors.push(behavior);
    }
    Ok(behaviors)
}

/// Binds a circuit's entities into a stampable device list: resolves pins
/// and internal nodes, allocates branch-current unknowns, and resolves
/// current-controlled sources' references to their controlling source.
pub fn bind(circuit: &Circuit, vars: &mut VariableSet) -> Result<Vec<Box<dyn Behavior>>> {
    let mut behaviors = construct(circuit, vars)?;

    for behavior in &mut behaviors {
        behavior.bind_variables(vars)?;
    }

    let mut by_name = HashMap::new();
    for behavior in &behaviors {
        if let Some(branch) = behavior.branch_variable() {
            by_name.insert(behavior.name().to_string(), branch);
        }
    }
    let registry = BranchRegistry { by_name };

    for behavior in &mut behaviors {
        behavior.setup(&registry)?;
    }

    Ok(behaviors)
}
