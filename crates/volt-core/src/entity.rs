use crate::parameter::ParameterSet;

/// A circuit component as the parser/builder hands it over: a stable name,
/// an ordered pin list, and a parameter set. Immutable in structure during
/// a simulation — only the `ParameterSet` contents may be
/// read by behaviours; nothing mutates `name`/`pins`/`kind` after creation.
#[derive(Clone)]
pub struct Entity {
    name: String,
    kind: String,
    pins: Vec<String>,
    parameters: ParameterSet,
}

impl Entity {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        pins: Vec<String>,
        parameters: ParameterSet,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            pins,
            parameters,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device-kind tag (e.g. `"R"`, `"D"`, `"V"`), used by the binder to
    /// select which behaviour constructor to invoke.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn pins(&self) -> &[String] {
        &self.pins
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }
}
