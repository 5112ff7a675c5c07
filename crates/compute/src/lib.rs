//! Compute resources: a single stateless function bound to a role.

pub mod code;
pub mod function;

pub use code::{Bundling, Code};
pub use function::{Architecture, Function, FunctionProps, Handler, Runtime};
