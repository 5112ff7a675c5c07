//! `stackgraph-iam`: permission and trust model.
//!
//! Roles, the statements attached to them, the principals allowed to assume
//! them, and a pure evaluator answering "would this role be allowed to do X
//! on Y?". Nothing here talks to a cloud API.

pub mod action;
pub mod evaluate;
pub mod principal;
pub mod role;
pub mod statement;

pub use action::Action;
pub use evaluate::{AccessExplanation, Decision, effective_actions, evaluate, explain_access};
pub use principal::{ASSUME_ROLE, ASSUME_ROLE_WITH_WEB_IDENTITY, Principal, PrincipalKind};
pub use role::Role;
pub use statement::{Conditions, Effect, PolicyDocument, PolicyStatement, resource_matches};
