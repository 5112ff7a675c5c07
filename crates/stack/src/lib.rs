//! `stackgraph-stack`: the graph container and the assembled backend.
//!
//! [`Stack`] collects resource declarations, checks that every reference
//! resolves and that the graph is acyclic, and synthesizes a [`Template`].
//! [`Backend`] runs the builders for the serverless items backend and links
//! the forward references between them.

pub mod backend;
pub mod config;
pub mod graph;
pub mod output;
pub mod template;

pub use backend::{Backend, IdentitySubsystem, ROUTE_TABLE};
pub use config::{BackendConfig, ConfigError};
pub use graph::Stack;
pub use output::Output;
pub use template::{SynthesisContext, TEMPLATE_FORMAT_VERSION, Template};
