//! Tagged-variant parameter storage, replacing the reflection-based
//! parameter binding of the original implementation: a `ParameterValue`
//! enum looked up by name, with each device reading its own fields out of
//! a `ParameterSet` directly rather than through any binding layer.

use crate::error::Error;
use crate::waveform::Waveform;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Real(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Waveform(Waveform),
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Real(v)
    }
}
impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}
impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}
impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}
impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::String(v)
    }
}
impl From<Waveform> for ParameterValue {
    fn from(v: Waveform) -> Self {
        ParameterValue::Waveform(v)
    }
}

#[derive(Clone)]
struct Slot {
    value: ParameterValue,
    given: bool,
}

/// A named, scalar parameter bag. Names are compared case-insensitively
/// after trimming. Each value carries a `given` flag that
/// is set iff the user explicitly assigned it, versus a default applied by
/// the device itself.
#[derive(Default, Clone)]
pub struct ParameterSet {
    values: HashMap<String, Slot>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ParameterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit user assignment; marks the parameter as `given`.
    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.values.insert(
            normalize(name),
            Slot {
                value: value.into(),
                given: true,
            },
        );
    }

    /// Applies a device default. Does nothing if the parameter was already
    /// given (by the user) or already defaulted.
    pub fn set_default(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.values.entry(normalize(name)).or_insert(Slot {
            value: value.into(),
            given: false,
        });
    }

    #[must_use]
    pub fn given(&self, name: &str) -> bool {
        self.values
            .get(&normalize(name))
            .is_some_and(|s| s.given)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(&normalize(name)).map(|s| &s.value)
    }

    pub fn get_real(&self, name: &str) -> Result<f64, Error> {
        match self.get(name) {
            Some(ParameterValue::Real(v)) => Ok(*v),
            Some(ParameterValue::Int(v)) => Ok(*v as f64),
            Some(_) => Err(Error::InvalidParameterType {
                name: name.to_string(),
                reason: "expected a real value".to_string(),
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, Error> {
        match self.get(name) {
            Some(ParameterValue::Bool(v)) => Ok(*v),
            Some(_) => Err(Error::InvalidParameterType {
                name: name.to_string(),
                reason: "expected a bool value".to_string(),
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<&str, Error> {
        match self.get(name) {
            Some(ParameterValue::String(v)) => Ok(v.as_str()),
            Some(_) => Err(Error::InvalidParameterType {
                name: name.to_string(),
                reason: "expected a string value".to_string(),
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }

    pub fn get_waveform(&self, name: &str) -> Result<&Waveform, Error> {
        match self.get(name) {
            Some(ParameterValue::Waveform(w)) => Ok(w),
            Some(_) => Err(Error::InvalidParameterType {
                name: name.to_string(),
                reason: "expected a waveform value".to_string(),
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_flag_tracks_explicit_assignment() {
        let mut params = ParameterSet::new();
        params.set_default("is", 1e-14);
        assert!(!params.given("is"));
        params.set("is", 2e-14);
        assert!(params.given("is"));
        assert_eq!(params.get_real("is").unwrap(), 2e-14);
    }

    #[test]
    fn names_are_case_and_whitespace_insensitive() {
        let mut params = ParameterSet::new();
        params.set(" R ", 1000.0);
        assert_eq!(params.get_real("r").unwrap(), 1000.0);
        assert_eq!(params.get_real("R").unwrap(), 1000.0);
    }

}
