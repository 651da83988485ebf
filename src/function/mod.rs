//! Function entities.
//!
//! - [`ParamList`]: the typed parameters of a declaration
//! - [`FunctionSignature`]: what pass 1 knows about a declaration
//! - [`FunctionEntity`]: a fully compiled function
//! - [`FunctionChain`]: the functions of one compilation unit, in order

mod chain;
mod entity;
mod params;

pub use chain::FunctionChain;
pub use entity::{FunctionEntity, FunctionFlags, FunctionSignature};
pub use params::{Param, ParamList};
