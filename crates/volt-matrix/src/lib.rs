//! Handle-based sparse matrix assembly and factorization for the MNA
//! system, real-valued (DC/transient) and complex-valued (AC) alike.

pub mod complex;
pub mod error;
pub mod handle;
pub mod prelude;
pub mod real;

pub use complex::{ComplexFactorization, ComplexMatrix};
pub use error::Error;
pub use handle::{ElementHandle, RhsHandle};
pub use real::{RealFactorization, RealMatrix};
