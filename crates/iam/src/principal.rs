use serde_json::{Map, Value, json};

use stackgraph_core::Expr;

use crate::statement::{Conditions, POLICY_VERSION, conditions_json};

/// Default action used to assume a role trusted by a service.
pub const ASSUME_ROLE: &str = "sts:AssumeRole";

/// Action used by federated identities exchanging a web identity token.
pub const ASSUME_ROLE_WITH_WEB_IDENTITY: &str = "sts:AssumeRoleWithWebIdentity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalKind {
    /// A cloud service, e.g. `lambda.amazonaws.com`.
    Service(String),
    /// A federated identity provider, e.g. `cognito-identity.amazonaws.com`.
    Federated(String),
}

/// Who may assume a role, and under which conditions.
///
/// This is the trust side of a role; the permission side lives in
/// [`crate::Role`]'s policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    kind: PrincipalKind,
    assume_action: String,
    conditions: Conditions,
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Service(name.into()),
            assume_action: ASSUME_ROLE.to_string(),
            conditions: Conditions::new(),
        }
    }

    pub fn federated(provider: impl Into<String>, assume_action: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Federated(provider.into()),
            assume_action: assume_action.into(),
            conditions: Conditions::new(),
        }
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

    pub fn kind(&self) -> &PrincipalKind {
        &self.kind
    }

    pub fn assume_action(&self) -> &str {
        &self.assume_action
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Value of one trust condition, if present.
    pub fn condition(&self, operator: &str, key: &str) -> Option<&Expr> {
        self.conditions.get(operator).and_then(|entries| entries.get(key))
    }

    pub fn is_federated(&self) -> bool {
        matches!(self.kind, PrincipalKind::Federated(_))
    }

    pub fn trust_statement(&self) -> Value {
        let principal = match &self.kind {
            PrincipalKind::Service(name) => json!({ "Service": name }),
            PrincipalKind::Federated(provider) => json!({ "Federated": provider }),
        };
        let mut out = Map::new();
        out.insert("Action".to_string(), json!(self.assume_action));
        out.insert("Effect".to_string(), json!("Allow"));
        out.insert("Principal".to_string(), principal);
        if !self.conditions.is_empty() {
            out.insert("Condition".to_string(), conditions_json(&self.conditions));
        }
        Value::Object(out)
    }

    /// The `AssumeRolePolicyDocument` of a role trusting this principal.
    pub fn trust_policy(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": [self.trust_statement()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph_core::LogicalId;

    #[test]
    fn service_principal_uses_assume_role() {
        let p = Principal::service("lambda.amazonaws.com");
        assert!(!p.is_federated());
        assert_eq!(
            p.trust_policy(),
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                }],
            })
        );
    }

    #[test]
    fn federated_principal_carries_conditions() {
        let pool = LogicalId::new("IdentityPool").unwrap();
        let p = Principal::federated(
            "cognito-identity.amazonaws.com",
            ASSUME_ROLE_WITH_WEB_IDENTITY,
        )
        .with_condition(
            "StringEquals",
            "cognito-identity.amazonaws.com:aud",
            Expr::reference(&pool),
        );

        assert_eq!(
            p.condition("StringEquals", "cognito-identity.amazonaws.com:aud"),
            Some(&Expr::reference(&pool))
        );
        assert!(p.condition("StringLike", "cognito-identity.amazonaws.com:aud").is_none());

        let stmt = p.trust_statement();
        assert_eq!(stmt["Action"], json!("sts:AssumeRoleWithWebIdentity"));
        assert_eq!(
            stmt["Condition"]["StringEquals"]["cognito-identity.amazonaws.com:aud"],
            json!({ "Ref": "IdentityPool" })
        );
    }
}
