//! `stackgraph-core`: graph foundation building blocks.
//!
//! Logical ids, intrinsic expressions, durations and the `Resource` trait.
//! This crate knows nothing about concrete resource kinds.

pub mod duration;
pub mod error;
pub mod expr;
pub mod id;
pub mod resource;

pub use duration::Duration;
pub use error::{GraphError, GraphResult};
pub use expr::{Expr, Pseudo};
pub use id::{LogicalId, SynthesisId};
pub use resource::{DeletionPolicy, Resource, ResourceDeclaration};
