//! Permission statements and policy documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stackgraph_core::{Expr, GraphError, GraphResult};

use crate::Action;
use crate::action::wildcard_match;

/// Policy language version emitted in every document.
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl core::fmt::Display for Effect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Effect::Allow => f.write_str("Allow"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

/// Condition block: operator -> context key -> value.
pub type Conditions = BTreeMap<String, BTreeMap<String, Expr>>;

pub(crate) fn conditions_json(conditions: &Conditions) -> Value {
    let mut out = Map::new();
    for (operator, entries) in conditions {
        let inner: Map<String, Value> = entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        out.insert(operator.clone(), Value::Object(inner));
    }
    Value::Object(out)
}

/// Single values render as scalars, several as a list.
fn one_or_many(values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(values)
    }
}

/// One permission statement: effect x actions x resources.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<Action>,
    resources: Vec<Expr>,
    conditions: Conditions,
}

impl PolicyStatement {
    pub fn new(effect: Effect) -> Self {
        Self {
            sid: None,
            effect,
            actions: Vec::new(),
            resources: Vec::new(),
            conditions: Conditions::new(),
        }
    }

    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn with_actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn with_resource(mut self, resource: impl Into<Expr>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn with_resources<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Expr>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn with_condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Expr>,
    ) -> Self {
        self.conditions
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn resources(&self) -> &[Expr] {
        &self.resources
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// A statement must name at least one action and one resource.
    pub fn validate(&self) -> GraphResult<()> {
        if self.actions.is_empty() {
            return Err(GraphError::validation("policy statement has no actions"));
        }
        if self.actions.iter().any(|a| a.as_str().trim().is_empty()) {
            return Err(GraphError::validation("policy statement has an empty action"));
        }
        if self.resources.is_empty() {
            return Err(GraphError::validation("policy statement has no resources"));
        }
        Ok(())
    }

    pub fn covers_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a.matches(action))
    }

    pub fn covers_resource(&self, resource: &Expr) -> bool {
        self.resources.iter().any(|r| resource_matches(r, resource))
    }

    /// Whether this statement speaks about `action` on `resource`.
    ///
    /// Conditions are not evaluated: they depend on request context that only
    /// exists at request time.
    pub fn applies_to(&self, action: &str, resource: &Expr) -> bool {
        self.covers_action(action) && self.covers_resource(resource)
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(sid) = &self.sid {
            out.insert("Sid".to_string(), json!(sid));
        }
        out.insert("Effect".to_string(), json!(self.effect));
        out.insert(
            "Action".to_string(),
            one_or_many(self.actions.iter().map(|a| json!(a.as_str())).collect()),
        );
        out.insert(
            "Resource".to_string(),
            one_or_many(self.resources.iter().map(Expr::to_json).collect()),
        );
        if !self.conditions.is_empty() {
            out.insert("Condition".to_string(), conditions_json(&self.conditions));
        }
        Value::Object(out)
    }
}

/// Resource pattern matching.
///
/// Literal ARNs may use `*`/`?` wildcards. A join of literals and pseudo
/// parameters matches a literal ARN with each pseudo parameter standing for
/// any value. Other deferred expressions only match themselves.
pub fn resource_matches(pattern: &Expr, resource: &Expr) -> bool {
    if pattern.is_wildcard() || pattern == resource {
        return true;
    }
    match (pattern_glob(pattern), resource.as_literal()) {
        (Some(p), Some(r)) => wildcard_match(&p, r),
        _ => false,
    }
}

fn pattern_glob(pattern: &Expr) -> Option<String> {
    match pattern {
        Expr::Literal(value) => Some(value.clone()),
        Expr::Pseudo(_) => Some("*".to_string()),
        Expr::Join { separator, parts } => {
            let parts = parts.iter().map(pattern_glob).collect::<Option<Vec<_>>>()?;
            Some(parts.join(separator))
        }
        Expr::Ref(_) | Expr::GetAtt { .. } => None,
    }
}

/// Ordered list of statements rendered as one policy document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: PolicyStatement) -> GraphResult<()> {
        statement.validate()?;
        self.statements.push(statement);
        Ok(())
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph_core::LogicalId;

    fn table_arn() -> Expr {
        Expr::get_att(&LogicalId::new("Table").unwrap(), "Arn")
    }

    #[test]
    fn single_action_and_resource_render_as_scalars() {
        let stmt = PolicyStatement::allow()
            .with_action("dynamodb:GetItem")
            .with_resource(table_arn());
        assert_eq!(
            stmt.to_json(),
            json!({
                "Effect": "Allow",
                "Action": "dynamodb:GetItem",
                "Resource": { "Fn::GetAtt": ["Table", "Arn"] },
            })
        );
    }

    #[test]
    fn multiple_actions_render_as_list_with_conditions() {
        let stmt = PolicyStatement::allow()
            .with_sid("Identity")
            .with_actions(["cognito-idp:*", "cognito-identity:*"])
            .with_resource(Expr::wildcard())
            .with_condition("StringEquals", "aws:RequestedRegion", "us-east-1");
        let rendered = stmt.to_json();
        assert_eq!(rendered["Sid"], json!("Identity"));
        assert_eq!(rendered["Action"], json!(["cognito-idp:*", "cognito-identity:*"]));
        assert_eq!(rendered["Resource"], json!("*"));
        assert_eq!(
            rendered["Condition"],
            json!({ "StringEquals": { "aws:RequestedRegion": "us-east-1" } })
        );
    }

    #[test]
    fn empty_statements_are_rejected() {
        let mut doc = PolicyDocument::new();
        let err = doc
            .push(PolicyStatement::allow().with_resource(Expr::wildcard()))
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
        assert!(doc.push(PolicyStatement::allow().with_action("s3:GetObject")).is_err());
        assert!(doc.is_empty());
    }

    #[test]
    fn deferred_resources_match_only_themselves() {
        let other = Expr::get_att(&LogicalId::new("Other").unwrap(), "Arn");
        assert!(resource_matches(&table_arn(), &table_arn()));
        assert!(!resource_matches(&table_arn(), &other));
        assert!(resource_matches(&Expr::wildcard(), &other));
    }

    #[test]
    fn literal_arns_match_wildcards() {
        let pattern = Expr::literal("arn:aws:logs:us-east-1:123:log-group:/aws/lambda/*");
        let group = Expr::literal("arn:aws:logs:us-east-1:123:log-group:/aws/lambda/items");
        assert!(resource_matches(&pattern, &group));
        assert!(!resource_matches(&group, &pattern));
    }

    #[test]
    fn pseudo_parameters_in_joins_match_any_value() {
        let pattern = Expr::arn("logs", vec!["log-group:/aws/lambda/*".into()]);
        let group = Expr::literal("arn:aws:logs:us-east-1:123456789012:log-group:/aws/lambda/items-handler:*");
        assert!(resource_matches(&pattern, &group));

        let elsewhere = Expr::literal("arn:aws:logs:us-east-1:123456789012:log-group:/ecs/items");
        assert!(!resource_matches(&pattern, &elsewhere));

        let with_ref = Expr::join("/", vec![Expr::literal("arn:aws:s3:::"), table_arn()]);
        assert!(!resource_matches(&with_ref, &Expr::literal("arn:aws:s3:::x/y")));
    }
}
