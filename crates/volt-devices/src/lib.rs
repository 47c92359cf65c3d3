//! Representative device library: behaviours that bind an `Entity`'s
//! parameters and pins into stamps against a [`volt_matrix::RealMatrix`] /
//! [`volt_matrix::ComplexMatrix`], per the `Behavior` contract in
//! [`behavior`].

pub mod behavior;
pub mod capacitor;
pub mod controlled;
pub mod diode;
pub mod error;
pub mod inductor;
pub mod prelude;
pub mod resistor;
pub mod sources;
pub mod switch;

pub use behavior::{Behavior, SiblingLookup};
pub use capacitor::Capacitor;
pub use controlled::{Cccs, Ccvs, Vccs, Vcvs};
pub use diode::Diode;
pub use error::Error;
pub use inductor::Inductor;
pub use resistor::Resistor;
pub use sources::{CurrentSource, VoltageSource};
pub use switch::VoltageSwitch;
