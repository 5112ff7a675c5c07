//! Process-wide logging setup for the `stackgraph` binary.

pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings, init};
