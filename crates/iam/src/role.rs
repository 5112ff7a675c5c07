use serde_json::{Map, Value, json};

use stackgraph_core::{Expr, GraphError, GraphResult, LogicalId, Resource};

use crate::{Effect, PolicyDocument, PolicyStatement, Principal};

const MAX_ROLE_NAME_LEN: usize = 64;

/// An IAM role: a trust principal plus an additive list of permission
/// statements.
///
/// Statements can only be appended. There is no removal operation, so the
/// effective permission set of an allow-only role is the union of everything
/// ever attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    logical_id: LogicalId,
    role_name: Option<String>,
    description: Option<String>,
    assumed_by: Principal,
    policy: PolicyDocument,
}

impl Role {
    pub fn new(logical_id: LogicalId, assumed_by: Principal) -> Self {
        Self {
            logical_id,
            role_name: None,
            description: None,
            assumed_by,
            policy: PolicyDocument::new(),
        }
    }

    pub fn with_role_name(mut self, name: impl Into<String>) -> GraphResult<Self> {
        let name = name.into();
        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c));
        if name.is_empty() || name.len() > MAX_ROLE_NAME_LEN || !valid_chars {
            return Err(GraphError::validation(format!("invalid role name '{name}'")));
        }
        self.role_name = Some(name);
        Ok(self)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach one more statement to the role's inline policy.
    pub fn add_to_policy(&mut self, statement: PolicyStatement) -> GraphResult<()> {
        tracing::debug!(
            role = %self.logical_id,
            effect = %statement.effect(),
            actions = statement.actions().len(),
            resources = statement.resources().len(),
            "policy statement attached"
        );
        self.policy.push(statement)
    }

    pub fn assumed_by(&self) -> &Principal {
        &self.assumed_by
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        self.policy.statements()
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role_name.as_deref()
    }

    /// True when no statement of the role denies anything.
    pub fn is_allow_only(&self) -> bool {
        self.statements().iter().all(|s| s.effect() == Effect::Allow)
    }

    pub fn arn(&self) -> Expr {
        self.attribute("Arn")
    }

    fn policy_name(&self) -> String {
        format!("{}DefaultPolicy", self.logical_id)
    }
}

impl Resource for Role {
    fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Role"
    }

    fn properties(&self) -> Value {
        let mut props = Map::new();
        props.insert(
            "AssumeRolePolicyDocument".to_string(),
            self.assumed_by.trust_policy(),
        );
        if let Some(name) = &self.role_name {
            props.insert("RoleName".to_string(), json!(name));
        }
        if let Some(description) = &self.description {
            props.insert("Description".to_string(), json!(description));
        }
        if !self.policy.is_empty() {
            props.insert(
                "Policies".to_string(),
                json!([{
                    "PolicyName": self.policy_name(),
                    "PolicyDocument": self.policy.to_json(),
                }]),
            );
        }
        Value::Object(props)
    }
}
