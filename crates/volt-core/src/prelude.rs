pub use crate::error::Error;
pub type Result<T> = core::result::Result<T, Error>;

pub use crate::constants::BaseConfiguration;
pub use crate::variable::{Variable, VariableKind, VariableSet};
