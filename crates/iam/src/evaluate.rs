use std::collections::BTreeSet;

use serde::Serialize;

use stackgraph_core::{Expr, Resource};

use crate::{Effect, PolicyStatement, Role};

/// Outcome of evaluating a request against a set of statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    /// A matching `Deny` statement exists; it wins over any allow.
    ExplicitDeny,
    /// Nothing matched.
    ImplicitDeny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Evaluate `action` on `resource` against `statements`.
///
/// - No IO
/// - No panics
/// - Conditions are not evaluated (they need request-time context)
pub fn evaluate(statements: &[PolicyStatement], action: &str, resource: &Expr) -> Decision {
    let mut allowed = false;
    for statement in statements.iter().filter(|s| s.applies_to(action, resource)) {
        match statement.effect() {
            Effect::Deny => return Decision::ExplicitDeny,
            Effect::Allow => allowed = true,
        }
    }
    if allowed {
        Decision::Allow
    } else {
        Decision::ImplicitDeny
    }
}

/// Union of allowed action patterns whose statements cover `resource`.
pub fn effective_actions(role: &Role, resource: &Expr) -> BTreeSet<String> {
    role.statements()
        .iter()
        .filter(|s| s.effect() == Effect::Allow && s.covers_resource(resource))
        .flat_map(|s| s.actions().iter().map(|a| a.as_str().to_string()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an access decision for one role.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub role: String,
    pub action: String,
    pub resource: String,
    pub decision: Decision,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Indexes (in attachment order) of the statements that matched.
    pub matched_statements: Vec<usize>,

    /// Allowed action patterns that apply to the resource, sorted.
    pub effective_actions: Vec<String>,

    /// Whether any allow statement grants `*` on this resource.
    pub has_wildcard: bool,

    /// What could be changed to get the access, if denied.
    pub suggestions: Vec<String>,
}

/// Explain why `role` would be allowed or denied `action` on `resource`.
///
/// Answers the operator question "why can (or can't) this function touch
/// that table?" without deploying anything.
pub fn explain_access(role: &Role, action: &str, resource: &Expr) -> AccessExplanation {
    let statements = role.statements();
    let decision = evaluate(statements, action, resource);

    let matched_statements: Vec<usize> = statements
        .iter()
        .enumerate()
        .filter(|(_, s)| s.applies_to(action, resource))
        .map(|(i, _)| i)
        .collect();

    let effective: Vec<String> = effective_actions(role, resource).into_iter().collect();
    let has_wildcard = effective.iter().any(|a| a == "*");

    let reason = match decision {
        Decision::Allow if has_wildcard => {
            format!("role grants wildcard action '*' on {resource}")
        }
        Decision::Allow => format!(
            "statement(s) {matched_statements:?} allow '{action}' on {resource}"
        ),
        Decision::ExplicitDeny => format!(
            "statement(s) {matched_statements:?} match and at least one explicitly denies '{action}'"
        ),
        Decision::ImplicitDeny => format!(
            "no statement allows '{action}' on {resource}. Current actions on this resource: {effective:?}"
        ),
    };

    let mut suggestions = Vec::new();
    if decision == Decision::ImplicitDeny {
        let action_elsewhere = statements
            .iter()
            .any(|s| s.effect() == Effect::Allow && s.covers_action(action));
        if action_elsewhere {
            suggestions.push(format!(
                "'{action}' is allowed on other resources; add {resource} to that statement's resources"
            ));
        }
        suggestions.push(format!(
            "attach a statement allowing '{action}' on {resource} to role '{}'",
            role.logical_id()
        ));
    }

    AccessExplanation {
        role: role.logical_id().to_string(),
        action: action.to_string(),
        resource: resource.to_string(),
        decision,
        reason,
        matched_statements,
        effective_actions: effective,
        has_wildcard,
        suggestions,
    }
}
