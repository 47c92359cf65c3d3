use crate::entity::Entity;
use crate::error::Error;
use std::collections::HashMap;

/// A collection of entities. The parser is responsible for
/// constructing fully-populated entities; `Circuit` just owns them and
/// enforces unique names. `original_value` / `.param` expansion and model
/// binding happen upstream, outside this crate's scope.
#[derive(Default, Clone)]
pub struct Circuit {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl Circuit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: Entity) -> Result<(), Error> {
        let key = entity.name().to_lowercase();
        if self.index.contains_key(&key) {
            return Err(Error::DuplicateEntity(entity.name().to_string()));
        }
        self.index.insert(key, self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    #[must_use]
    pub fn remove(&mut self, name: &str) -> Option<Entity> {
        let key = name.to_lowercase();
        let idx = self.index.remove(&key)?;
        let removed = self.entities.remove(idx);
        // Reindex entities shifted down by the removal.
        for value in self.index.values_mut() {
            if *value > idx {
                *value -= 1;
            }
        }
        Some(removed)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Entity> {
        self.index.get(&name.to_lowercase()).map(|&i| &self.entities[i])
    }

    /// Mutable counterpart to [`Circuit::lookup`], used by the DC sweep driver to
    /// rewrite a swept source's value between points.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Entity> {
        let idx = *self.index.get(&name.to_lowercase())?;
        Some(&mut self.entities[idx])
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterSet;

    fn resistor(name: &str) -> Entity {
        let mut params = ParameterSet::new();
        params.set("r", 1000.0);
        Entity::new(name, "R", vec!["a".into(), "b".into()], params)
    }

    #[test]
    fn add_rejects_duplicate_names_case_insensitively() {
        let mut circuit = Circuit::new();
        circuit.add(resistor("R1")).unwrap();
        let err = circuit.add(resistor("r1")).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(_)));
    }

    #[test]
    fn lookup_and_remove_round_trip() {
        let mut circuit = Circuit::new();
        circuit.add(resistor("R1")).unwrap();
        circuit.add(resistor("R2")).unwrap();
        assert!(circuit.lookup("r1").is_some());
        let removed = circuit.remove("R1").unwrap();
        assert_eq!(removed.name(), "R1");
        assert!(circuit.lookup("r1").is_none());
        assert!(circuit.lookup("R2").is_some());
        assert_eq!(circuit.entities().len(), 1);
    }
}
